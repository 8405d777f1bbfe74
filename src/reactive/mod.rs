//! Minimal reactive substrate.
//!
//! Actions and models expose their state through three primitives:
//!
//! - [`Observable`]: a cell with `get`/`set` and synchronous change callbacks
//! - [`Computed`]: a read-only value derived from an observable
//! - [`Scope`]: a group of subscriptions disposed together
//!
//! Callbacks run synchronously, in the order state is mutated. Each
//! observable is also backed by a `tokio::sync::watch` channel so async
//! code can await changes.

mod computed;
mod observable;
mod scope;
mod subscription;

pub use computed::Computed;
pub use observable::Observable;
pub use scope::Scope;
pub use subscription::Subscription;

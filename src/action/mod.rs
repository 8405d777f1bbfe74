//! Actions: observable state machines wrapped around model methods.
//!
//! An action is created once per owner and definition. Executing it moves it
//! to `pending` synchronously and hands back an [`ActionPromise`]; once the
//! promise is driven to completion the action settles:
//!
//! | Outcome of the operation        | Final state     | Promise        |
//! |---------------------------------|-----------------|----------------|
//! | `Ok(())`                        | `ready`         | `Ok(())`       |
//! | `Err(Cancelled)` after `lock`   | `lock`          | `Ok(())`       |
//! | `Err(Cancelled)` otherwise      | `abort`         | `Ok(())`       |
//! | a crate [`Error`](crate::Error) kind or [`Defect`](crate::Defect) | `ready` | `Err(error)` |
//! | any other error                 | `error`         | `Ok(())`       |
//!
//! Captured errors never reject the promise, so a parent action awaiting a
//! child is not failed by the child. Parents inspect children explicitly.

pub mod cancellation;
mod def;
mod erased;
mod machine;
mod promise;
mod typed;

pub use cancellation::{AbortReason, CancellationHandle, Cancelled};
pub use def::{ActionDef, Invocation};
pub use erased::DynAction;
pub(crate) use erased::ErasedAction;
pub use machine::ActionCore;
pub use promise::ActionPromise;
pub use typed::Action;

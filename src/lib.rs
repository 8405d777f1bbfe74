//! Modeler: observable, cancellable async actions for domain models
//!
//! Modeler turns selected methods of a plain domain model into *actions*:
//! small state machines that track whether the method is running, failed,
//! was cancelled or is locked, and that notify observers synchronously on
//! every change. UI layers bind to that state instead of keeping their own
//! loading and error flags.
//!
//! # Core Concepts
//!
//! - **Action**: the state machine around one method of one owner
//!   (`ready`, `pending`, `error`, `lock`, `abort`)
//! - **Definition**: a type implementing [`ActionDef`] that marks a method
//!   as an action, usually generated with [`define_action!`]
//! - **Model**: a [`Model`] facade over an owner implementing
//!   [`ProtoModel`], handing out one cached action per definition
//! - **Cancellation**: a [`CancellationHandle`] given to every execution,
//!   shareable between a parent action and the actions it calls
//!
//! Failures of an operation are captured on the action (state `error`)
//! rather than returned, so awaiting a child action never fails the parent.
//! Only misuse ([`StatusConflictError`], [`InternalError`],
//! [`UnexpectedAbortError`]) and [`Defect`]s reach the caller.
//!
//! # Example
//!
//! ```rust
//! use modeler::prelude::*;
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! struct Catalog {
//!     registry: Registry<Catalog>,
//!     items: Mutex<Vec<String>>,
//! }
//!
//! impl Catalog {
//!     async fn fetch_all(self: Arc<Self>) -> anyhow::Result<()> {
//!         *self.items.lock() = vec!["a".to_string(), "b".to_string()];
//!         Ok(())
//!     }
//!
//!     async fn fail(self: Arc<Self>) -> anyhow::Result<()> {
//!         anyhow::bail!("x")
//!     }
//! }
//!
//! define_action!(struct FetchAll: Catalog => async fetch_all(););
//! define_action!(struct Fail: Catalog => async fail(););
//!
//! impl ProtoModel for Catalog {
//!     fn registry(&self) -> &Registry<Self> {
//!         &self.registry
//!     }
//!
//!     fn declare(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
//!         schema.action::<FetchAll>().action::<Fail>()
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let catalog = Model::wrap(Catalog {
//!     registry: Registry::new(),
//!     items: Mutex::new(Vec::new()),
//! })?;
//!
//! catalog.action::<FetchAll>()?.exec(())?.await?;
//! assert!(catalog.action::<FetchAll>()?.is_ready());
//! assert_eq!(catalog.items.lock().len(), 2);
//!
//! // The promise resolves; the failure is kept on the action.
//! catalog.action::<Fail>()?.exec(())?.await?;
//! let fail = catalog.action::<Fail>()?;
//! assert!(fail.is_error());
//! assert_eq!(fail.error().unwrap().cause().to_string(), "x");
//! assert!(catalog.has_action_with_error());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod core;
mod error;
pub mod executor;
mod macros;
pub mod model;
pub mod reactive;
pub mod snapshot;
pub mod validation;

// Re-export commonly used types
pub use action::{
    AbortReason, Action, ActionCore, ActionDef, ActionPromise, CancellationHandle, Cancelled,
    DynAction, Invocation,
};
pub use crate::core::{ActionBits, ActionId, ActionState};
pub use error::{
    ActionError, Defect, Error, InternalError, ModelError, StatusConflictError,
    UnexpectedAbortError,
};
pub use executor::{ActionExecutor, ExecutorError};
pub use model::{Model, ModelFactory, ModelId, ProtoModel, Registry, Schema, SchemaBuilder};
pub use snapshot::{ActionSnapshot, ModelSnapshot};

/// Everything needed to declare and use a model.
pub mod prelude {
    pub use crate::define_action;
    pub use crate::{
        AbortReason, Action, ActionDef, ActionPromise, ActionState, CancellationHandle, Cancelled,
        Defect, DynAction, Invocation, Model, ModelFactory, ProtoModel, Registry, SchemaBuilder,
    };
}

use super::facade::Model;
use super::registry::Registry;
use super::schema::SchemaBuilder;
use crate::action::{Action, ActionDef, ActionPromise, CancellationHandle};
use crate::error::{Error, InternalError};
use std::sync::Arc;

/// A domain model whose actions are managed by this crate.
///
/// Implementors embed a [`Registry`] and declare their members once in
/// [`ProtoModel::declare`]. Inside the model, `self.call::<D>(args)` routes
/// an internal call through the action exactly like
/// `model.action::<D>()?.exec(args)` from outside.
///
/// # Example
///
/// ```rust
/// use modeler::prelude::*;
/// use std::sync::Arc;
///
/// struct Session {
///     registry: Registry<Session>,
/// }
///
/// impl Session {
///     async fn refresh(self: Arc<Self>) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// define_action!(struct Refresh: Session => async refresh(););
///
/// impl ProtoModel for Session {
///     fn registry(&self) -> &Registry<Self> {
///         &self.registry
///     }
///
///     fn declare(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
///         schema.action::<Refresh>()
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let session = Model::wrap(Session { registry: Registry::new() })?;
/// let refresh = session.action::<Refresh>()?;
/// let promise = refresh.exec(())?;
/// assert!(refresh.is_pending());
/// promise.await?;
/// assert!(refresh.is_ready());
/// # Ok(())
/// # }
/// ```
pub trait ProtoModel: Send + Sync + Sized + 'static {
    fn registry(&self) -> &Registry<Self>;

    /// Register the model's actions and plain methods.
    fn declare(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;

    /// Runs once, when the owner is first wrapped into a [`Model`]. The
    /// place to register watchers that need a handle to the owner.
    fn setup(self: &Arc<Self>) {}

    /// Cached action of definition `D` on this owner.
    fn action<D: ActionDef<Self>>(self: &Arc<Self>) -> Result<Arc<Action<Self, D>>, InternalError> {
        self.registry().action::<D>(self)
    }

    /// Execute the action of `D` with a fresh cancellation handle.
    fn call<D: ActionDef<Self>>(self: &Arc<Self>, args: D::Args) -> Result<ActionPromise, Error> {
        self.action::<D>()?.exec(args)
    }

    /// Execute the action of `D` sharing the caller's cancellation handle.
    fn call_with<D: ActionDef<Self>>(
        self: &Arc<Self>,
        args: D::Args,
        handle: CancellationHandle,
    ) -> Result<ActionPromise, Error> {
        self.action::<D>()?.exec_with(args, handle)
    }

    fn has_pending_actions(&self) -> bool {
        self.registry().has_pending_actions()
    }

    fn has_action_with_error(&self) -> bool {
        self.registry().has_action_with_error()
    }
}

/// Models that can be constructed and wrapped in one step.
pub trait ModelFactory: ProtoModel {
    type Params;

    fn construct(params: Self::Params) -> Self;

    /// Construct the owner and wrap it.
    fn create(params: Self::Params) -> Result<Model<Self>, InternalError> {
        Model::wrap(Self::construct(params))
    }
}

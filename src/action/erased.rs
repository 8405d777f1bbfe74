//! Actions with their definition type erased, for lookup by name.

use super::cancellation::CancellationHandle;
use super::def::ActionDef;
use super::machine::ActionCore;
use super::promise::ActionPromise;
use super::typed::Action;
use crate::error::{Error, InternalError};
use crate::model::ProtoModel;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub(crate) trait ErasedAction: Send + Sync {
    fn core(&self) -> &ActionCore;

    /// `TypeId` of the definition.
    fn def_id(&self) -> TypeId;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn exec_any(
        self: Arc<Self>,
        args: Box<dyn Any + Send>,
        handle: CancellationHandle,
    ) -> Result<ActionPromise, Error>;
}

impl<M, D> ErasedAction for Action<M, D>
where
    M: ProtoModel,
    D: ActionDef<M>,
{
    fn core(&self) -> &ActionCore {
        Action::core(self)
    }

    fn def_id(&self) -> TypeId {
        TypeId::of::<D>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn exec_any(
        self: Arc<Self>,
        args: Box<dyn Any + Send>,
        handle: CancellationHandle,
    ) -> Result<ActionPromise, Error> {
        let args = args
            .downcast::<D::Args>()
            .map_err(|_| InternalError::ArgumentMismatch {
                name: D::NAME.to_string(),
            })?;
        self.exec_with(*args, handle)
    }
}

/// An action found by name.
///
/// Exposes the full [`ActionCore`] surface; executing it needs arguments of
/// the definition's `Args` type, checked at run time.
///
/// # Example
///
/// ```rust
/// use modeler::prelude::*;
/// use std::sync::Arc;
///
/// struct Counter {
///     registry: Registry<Counter>,
/// }
///
/// impl Counter {
///     fn bump(&self, _by: u32) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// define_action!(struct Bump: Counter => sync bump(by: u32););
///
/// impl ProtoModel for Counter {
///     fn registry(&self) -> &Registry<Self> {
///         &self.registry
///     }
///
///     fn declare(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
///         schema.action::<Bump>()
///     }
/// }
///
/// let model = Model::wrap(Counter { registry: Registry::new() }).unwrap();
/// let bump = model.action_by_name("bump").unwrap();
/// assert!(bump.exec(3u32).is_ok());
/// assert!(bump.exec("three").is_err());
/// assert!(bump.is_ready());
/// ```
#[derive(Clone)]
pub struct DynAction {
    inner: Arc<dyn ErasedAction>,
}

impl DynAction {
    pub(crate) fn new(inner: Arc<dyn ErasedAction>) -> Self {
        Self { inner }
    }

    /// Run the action with a fresh cancellation handle. `args` must be the
    /// definition's `Args` type.
    pub fn exec<A: Any + Send>(&self, args: A) -> Result<ActionPromise, Error> {
        self.exec_with(args, CancellationHandle::new())
    }

    /// Run the action with the caller's cancellation handle.
    pub fn exec_with<A: Any + Send>(
        &self,
        args: A,
        handle: CancellationHandle,
    ) -> Result<ActionPromise, Error> {
        Arc::clone(&self.inner).exec_any(Box::new(args), handle)
    }

    /// The typed action, if it was defined by `D`.
    pub fn downcast<M, D>(&self) -> Option<Arc<Action<M, D>>>
    where
        M: ProtoModel,
        D: ActionDef<M>,
    {
        Arc::clone(&self.inner).into_any().downcast::<Action<M, D>>().ok()
    }

    /// Whether the action was defined by `D`.
    pub fn is_defined_by<M, D: ActionDef<M>>(&self) -> bool {
        self.inner.def_id() == TypeId::of::<D>()
    }

    /// Whether both handles refer to the same action.
    pub fn ptr_eq(&self, other: &DynAction) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl Deref for DynAction {
    type Target = ActionCore;

    fn deref(&self) -> &ActionCore {
        self.inner.core()
    }
}

impl fmt::Debug for DynAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner.core(), f)
    }
}

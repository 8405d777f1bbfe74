use super::cancellation::CancellationHandle;
use super::def::{ActionDef, Invocation};
use super::machine::ActionCore;
use super::promise::ActionPromise;
use crate::core::ActionId;
use crate::error::{Error, InternalError};
use crate::model::{Model, ProtoModel, StateFlags};
use crate::validation::{into_errors, ArgumentError};
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// The action of definition `D` on one owner of type `M`.
///
/// Obtained from [`Model::action`] or [`ProtoModel::action`]; every lookup on
/// the same owner returns the same `Arc`. Everything that does not depend on
/// the argument type (state, payload, `lock`, `cancel`...) lives on
/// [`ActionCore`], reachable through `Deref`.
pub struct Action<M, D: ActionDef<M>> {
    core: ActionCore,
    owner: Weak<M>,
    args: Mutex<Option<D::Args>>,
    _def: PhantomData<fn() -> D>,
}

impl<M, D> Action<M, D>
where
    M: ProtoModel,
    D: ActionDef<M>,
{
    pub(crate) fn new(owner: Weak<M>, id: ActionId, flags: Arc<StateFlags>) -> Self {
        Self {
            core: ActionCore::new(id, D::NAME, flags),
            owner,
            args: Mutex::new(None),
            _def: PhantomData,
        }
    }

    /// Run the action with a fresh cancellation handle.
    ///
    /// The action is `pending` when this returns. Fails right away with a
    /// [`StatusConflictError`](crate::StatusConflictError) while the action
    /// is pending or locked.
    pub fn exec(self: &Arc<Self>, args: D::Args) -> Result<ActionPromise, Error> {
        self.exec_with(args, CancellationHandle::new())
    }

    /// Run the action with the caller's cancellation handle, so cancelling
    /// the caller's execution cancels this one too.
    pub fn exec_with(
        self: &Arc<Self>,
        args: D::Args,
        handle: CancellationHandle,
    ) -> Result<ActionPromise, Error> {
        let owner = self.owner.upgrade().ok_or_else(|| InternalError::OwnerDropped {
            name: D::NAME.to_string(),
        })?;

        self.core.begin(handle.clone())?;
        *self.args.lock() = Some(args.clone());

        let promise = match D::run(owner, args, handle.clone()) {
            Invocation::Done(result) => ActionPromise::settled(self.core.settle(&handle, result)),
            Invocation::Future(operation) => {
                let action = Arc::downgrade(self);
                let settle_with = handle.clone();
                let promise = ActionPromise::new(async move {
                    let result = operation.await;
                    match action.upgrade() {
                        Some(action) => action.core.settle(&settle_with, result),
                        // Nobody is left to observe a captured failure.
                        None => match result {
                            Ok(()) => Ok(()),
                            Err(error) => Error::from_operation(error).map_or(Ok(()), Err),
                        },
                    }
                });
                self.core.attach(&handle, &promise);
                promise
            }
        };

        Ok(promise)
    }

    /// Arguments of the last execution.
    pub fn args(&self) -> Option<D::Args> {
        self.args.lock().clone()
    }

    /// Check `args` without touching the action's state.
    pub fn validate(&self, args: &D::Args) -> Result<Vec<ArgumentError>, InternalError> {
        let owner = self.owner.upgrade().ok_or_else(|| InternalError::OwnerDropped {
            name: D::NAME.to_string(),
        })?;
        Ok(into_errors(D::validate(&owner, args)))
    }

    /// Facade of the owner, while it is alive.
    pub fn owner(&self) -> Option<Model<M>> {
        self.owner.upgrade().map(Model::from_arc_unchecked)
    }

    pub fn core(&self) -> &ActionCore {
        &self.core
    }
}

impl<M, D: ActionDef<M>> Deref for Action<M, D> {
    type Target = ActionCore;

    fn deref(&self) -> &ActionCore {
        &self.core
    }
}

impl<M, D: ActionDef<M>> fmt::Debug for Action<M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.core.id())
            .field("name", &D::NAME)
            .field("state", &self.core.state())
            .finish()
    }
}

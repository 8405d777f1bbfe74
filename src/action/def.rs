//! Declaring which methods of a model are actions.

use super::cancellation::CancellationHandle;
use crate::validation::ArgumentError;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// What an action implementation hands back when it is invoked.
pub enum Invocation {
    /// The implementation ran synchronously and already has its result.
    Done(anyhow::Result<()>),
    /// The implementation runs when the future is polled.
    Future(BoxFuture<'static, anyhow::Result<()>>),
}

impl Invocation {
    /// A synchronous implementation that succeeded.
    pub fn done() -> Self {
        Invocation::Done(Ok(()))
    }

    /// A synchronous implementation with the given result.
    pub fn finished(result: anyhow::Result<()>) -> Self {
        Invocation::Done(result)
    }

    /// An asynchronous implementation.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Invocation::Future(Box::pin(future))
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, Invocation::Done(_))
    }
}

/// Marks one method of model `M` as an action.
///
/// The implementing type is the action's identity: the model's registry
/// caches one action per definition type, so two definitions sharing a
/// `NAME` still get distinct actions. Most definitions are generated with
/// [`define_action!`](crate::define_action).
///
/// `run` receives the owner, the arguments and the execution's cancellation
/// handle. It returns `Err(Cancelled.into())` (see
/// [`Cancelled`](crate::Cancelled)) to stop on cancellation; any error that
/// is not one of the crate's rethrown kinds is captured on the action.
pub trait ActionDef<M>: Sized + 'static {
    /// Arguments of one invocation; the last ones are kept on the action.
    type Args: Clone + Send + Sync + 'static;

    /// Name of the method this definition marks.
    const NAME: &'static str;

    fn run(owner: Arc<M>, args: Self::Args, handle: CancellationHandle) -> Invocation;

    /// Advisory check of `args`, accumulating every failure.
    fn validate(owner: &M, args: &Self::Args) -> Validation<(), NonEmptyVec<ArgumentError>> {
        let _ = (owner, args);
        Validation::success(())
    }
}

use crate::error::Error;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Completion of one action execution.
///
/// A cloneable, lazily driven future: the operation makes progress while the
/// promise (or any clone of it) is awaited or spawned. Every clone observes
/// the same outcome, and [`ActionPromise::ptr_eq`] tells whether two
/// promises belong to the same execution.
///
/// The outcome is `Ok(())` on success, captured error, abort and lock; it is
/// an [`Error`] only for failures that must reach the caller.
#[derive(Clone)]
#[must_use = "an action promise does nothing unless awaited or spawned"]
pub struct ActionPromise {
    inner: Shared<BoxFuture<'static, Result<(), Error>>>,
}

impl ActionPromise {
    pub(crate) fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// A promise that is already complete with `outcome`; it peeks as
    /// settled right away.
    pub fn settled(outcome: Result<(), Error>) -> Self {
        let promise = Self::new(futures::future::ready(outcome));
        // A ready future completes on its first poll and stores the outcome.
        let _ = promise.inner.clone().now_or_never();
        promise
    }

    /// A promise that is already complete with `Ok(())`.
    pub fn resolved() -> Self {
        Self::settled(Ok(()))
    }

    /// Whether both promises belong to the same execution.
    pub fn ptr_eq(&self, other: &ActionPromise) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }

    /// Outcome, if the promise has already been driven to completion.
    pub fn peek(&self) -> Option<&Result<(), Error>> {
        self.inner.peek()
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }
}

impl Future for ActionPromise {
    type Output = Result<(), Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl fmt::Debug for ActionPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionPromise")
            .field("outcome", &self.peek())
            .finish()
    }
}

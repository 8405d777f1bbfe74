//! Cooperative cancellation for running actions.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why an action was cancelled. Any JSON value can serve as a reason.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbortReason(Value);

impl AbortReason {
    pub fn new(reason: impl Into<Value>) -> Self {
        Self(reason.into())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl From<&str> for AbortReason {
    fn from(reason: &str) -> Self {
        Self(Value::from(reason))
    }
}

impl From<String> for AbortReason {
    fn from(reason: String) -> Self {
        Self(Value::from(reason))
    }
}

impl From<Value> for AbortReason {
    fn from(reason: Value) -> Self {
        Self(reason)
    }
}

/// Signal an operation returns when it stops because its handle was
/// cancelled. Any other error is treated as a failure of the operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

#[derive(Debug)]
enum Cause {
    Lock,
    Requested(Option<AbortReason>),
}

/// Capability handed to every action execution to observe cancellation.
///
/// Clones share the same underlying token. Passing a handle to a nested
/// action (see `Action::exec_with`) makes cancelling the parent's handle
/// cancel the child too.
///
/// # Example
///
/// ```rust
/// use modeler::{AbortReason, CancellationHandle};
///
/// let handle = CancellationHandle::new();
/// assert!(handle.check().is_ok());
///
/// handle.abort(Some(AbortReason::from("user left")));
/// assert!(handle.is_cancelled());
/// assert_eq!(handle.reason().unwrap().as_str(), Some("user left"));
/// assert!(handle.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationHandle {
    token: CancellationToken,
    cause: Arc<Mutex<Option<Cause>>>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel with an optional reason. Only the first cancellation counts;
    /// returns whether this call cancelled the handle.
    pub fn abort(&self, reason: Option<AbortReason>) -> bool {
        self.trigger(Cause::Requested(reason))
    }

    pub(crate) fn abort_for_lock(&self) -> bool {
        self.trigger(Cause::Lock)
    }

    fn trigger(&self, cause: Cause) -> bool {
        {
            let mut slot = self.cause.lock();
            if slot.is_some() || self.token.is_cancelled() {
                return false;
            }
            *slot = Some(cause);
        }
        self.token.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason given to [`CancellationHandle::abort`], if any.
    pub fn reason(&self) -> Option<AbortReason> {
        match &*self.cause.lock() {
            Some(Cause::Requested(reason)) => reason.clone(),
            _ => None,
        }
    }

    /// Whether the handle was cancelled by locking its action.
    pub(crate) fn is_locked(&self) -> bool {
        matches!(&*self.cause.lock(), Some(Cause::Lock))
    }

    /// `Err(Cancelled)` once the handle is cancelled; use with `?` at
    /// checkpoints inside an operation.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes when the handle is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Drive `future` until it completes or the handle is cancelled.
    pub async fn run_until_cancelled<F>(&self, future: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Cancelled),
            output = future => Ok(output),
        }
    }

    /// The underlying token, for APIs that accept one directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether both handles are clones of one another.
    pub fn ptr_eq(&self, other: &CancellationHandle) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

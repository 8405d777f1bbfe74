//! Deferred, re-runnable execution of one action.
//!
//! An [`ActionExecutor`] remembers an action together with its arguments so
//! that a UI can offer "retry" without knowing what was being done. A failed
//! run keeps the executor armed and exposes the captured error; a successful
//! run resets it.

use crate::action::{Action, ActionDef};
use crate::error::{ActionError, Error};
use crate::model::ProtoModel;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::debug;

/// Errors returned by [`ActionExecutor::exec`].
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Action not initialized. Call .init(action, args) before .exec()")]
    NotInitialized,

    #[error(transparent)]
    Action(#[from] Error),
}

struct Served<M, D: ActionDef<M>> {
    action: Arc<Action<M, D>>,
    args: D::Args,
}

impl<M, D: ActionDef<M>> Clone for Served<M, D> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
            args: self.args.clone(),
        }
    }
}

/// Holds one action and its arguments until it runs successfully.
pub struct ActionExecutor<M, D: ActionDef<M>> {
    served: Mutex<Option<Served<M, D>>>,
    error: Mutex<Option<ActionError>>,
}

impl<M, D> ActionExecutor<M, D>
where
    M: ProtoModel,
    D: ActionDef<M>,
{
    pub fn new() -> Self {
        Self {
            served: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    /// Arm the executor with `action` and `args`, forgetting any previous
    /// error.
    pub fn init(&self, action: Arc<Action<M, D>>, args: D::Args) {
        *self.served.lock() = Some(Served { action, args });
        *self.error.lock() = None;
    }

    pub fn served_action(&self) -> Option<Arc<Action<M, D>>> {
        self.served.lock().as_ref().map(|served| Arc::clone(&served.action))
    }

    pub fn args(&self) -> Option<D::Args> {
        self.served.lock().as_ref().map(|served| served.args.clone())
    }

    /// Error captured by the last run, if it failed.
    pub fn error(&self) -> Option<ActionError> {
        self.error.lock().clone()
    }

    pub fn is_armed(&self) -> bool {
        self.served.lock().is_some()
    }

    /// Run the served action to completion. On a captured error the
    /// executor stays armed and keeps the error; otherwise it resets.
    pub async fn exec(&self) -> Result<(), ExecutorError> {
        let served = self
            .served
            .lock()
            .clone()
            .ok_or(ExecutorError::NotInitialized)?;

        served.action.exec(served.args)?.await?;

        if let Some(error) = served.action.error() {
            debug!(action = D::NAME, %error, "executor keeps failed action");
            *self.error.lock() = Some(error);
            return Ok(());
        }

        self.reset();
        Ok(())
    }

    /// Forget the served action, its arguments and its error.
    pub fn reset(&self) {
        *self.served.lock() = None;
        *self.error.lock() = None;
    }
}

impl<M, D> Default for ActionExecutor<M, D>
where
    M: ProtoModel,
    D: ActionDef<M>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, D: ActionDef<M>> fmt::Debug for ActionExecutor<M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("action", &D::NAME)
            .field("armed", &self.served.lock().is_some())
            .field("error", &self.error.lock().as_ref().map(ToString::to_string))
            .finish()
    }
}

//! Error taxonomy.
//!
//! Three families never mix:
//!
//! - programming mistakes ([`InternalError`]) and state-machine misuse
//!   ([`StatusConflictError`], [`UnexpectedAbortError`]) surface to the
//!   caller immediately;
//! - failures an operation flags as bugs ([`Defect`]) are rethrown through
//!   the action's promise untouched;
//! - every other operation failure is captured as an [`ActionError`] and
//!   stored on the action instead of being returned.

use crate::core::ActionState;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Configuration and lookup mistakes made while defining or using a model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InternalError {
    #[error("Model does not contain method {name}")]
    MethodNotFound { name: String },

    #[error("Method {name} is not action")]
    NotAnAction { name: String },

    #[error("Member {name} is declared twice")]
    DuplicateMember { name: String },

    #[error("Model members must have a non-empty name")]
    EmptyName,

    #[error("Owner of action {name} has been dropped")]
    OwnerDropped { name: String },

    #[error("Arguments passed to action {name} have the wrong type")]
    ArgumentMismatch { name: String },
}

/// A transition was attempted from a state that forbids it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Trying to update state of {name} from {from} to {to}")]
pub struct StatusConflictError {
    pub name: String,
    pub from: ActionState,
    pub to: ActionState,
}

/// A cancellation signal reached an action that had nothing to cancel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unexpected AbortError for the action {name} in state {state}")]
pub struct UnexpectedAbortError {
    pub name: String,
    pub state: ActionState,
}

/// A failure an operation marks as a bug rather than a runtime condition.
///
/// Returning a `Defect` from an action bypasses error capture: the promise
/// returned by `exec` rejects with it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct Defect {
    message: String,
}

impl Defect {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything `exec`, a promise, `unlock` or `reset_error` can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    StatusConflict(#[from] StatusConflictError),

    #[error(transparent)]
    UnexpectedAbort(#[from] UnexpectedAbortError),

    #[error(transparent)]
    Defect(#[from] Defect),
}

impl Error {
    /// Recover a rethrowable error from an operation failure, giving the
    /// failure back when it should be captured or treated as cancellation.
    pub(crate) fn from_operation(error: anyhow::Error) -> Result<Self, anyhow::Error> {
        let error = match error.downcast::<Error>() {
            Ok(found) => return Ok(found),
            Err(other) => other,
        };
        let error = match error.downcast::<InternalError>() {
            Ok(found) => return Ok(found.into()),
            Err(other) => other,
        };
        let error = match error.downcast::<StatusConflictError>() {
            Ok(found) => return Ok(found.into()),
            Err(other) => other,
        };
        let error = match error.downcast::<UnexpectedAbortError>() {
            Ok(found) => return Ok(found.into()),
            Err(other) => other,
        };
        match error.downcast::<Defect>() {
            Ok(found) => Ok(found.into()),
            Err(other) => Err(other),
        }
    }
}

/// An operation failure captured as the action's `error` payload.
///
/// Nested captures are not unwrapped: when a parent action fails with the
/// `ActionError` of a child, the parent's error has the child's error as
/// its cause.
#[derive(Clone)]
pub struct ActionError {
    action: &'static str,
    cause: Arc<anyhow::Error>,
}

impl ActionError {
    pub(crate) fn new(action: &'static str, cause: anyhow::Error) -> Self {
        Self {
            action,
            cause: Arc::new(cause),
        }
    }

    /// Name of the action that captured the failure.
    pub fn action_name(&self) -> &'static str {
        self.action
    }

    /// The original failure.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Whether this error was captured by the action named `name`.
    pub fn is_for_name(&self, name: &str) -> bool {
        self.action == name
    }

    /// Whether this error was captured by the action of definition `D`.
    pub fn is_for<M, D: crate::ActionDef<M>>(&self) -> bool {
        self.is_for_name(D::NAME)
    }

    /// Whether two handles point at the same captured failure.
    pub fn ptr_eq(&self, other: &ActionError) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionError")
            .field("action", &self.action)
            .field("cause", &self.cause.to_string())
            .finish()
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action {} throw error: {}", self.action, self.cause)
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let cause: &(dyn StdError + Send + Sync + 'static) = (*self.cause).as_ref();
        Some(cause)
    }
}

/// Captured errors of every failed action of one model.
#[derive(Debug, Clone, Error)]
#[error("{} action(s) of the model failed", .errors.len())]
pub struct ModelError {
    errors: Vec<ActionError>,
}

impl ModelError {
    pub(crate) fn new(errors: Vec<ActionError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[ActionError] {
        &self.errors
    }

    /// First error captured by any of the named actions.
    pub fn for_any(&self, names: &[&str]) -> Option<&ActionError> {
        self.errors
            .iter()
            .find(|error| names.iter().any(|name| error.is_for_name(name)))
    }
}

//! Pure transition table for actions.
//!
//! Every state change an action performs is first looked up here. The
//! table never touches action data; it only answers "what happens if
//! `operation` is applied in state `from`".

use super::state::ActionState;

/// Something that can be applied to an action.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Operation {
    /// Start the underlying operation.
    Exec,
    /// Disable the action, interrupting it if it is running.
    Lock,
    /// Leave the lock state.
    Unlock,
    /// Clear a captured error.
    ResetError,
    /// Cancel the running operation.
    Cancel,
    /// The operation completed successfully.
    Resolve,
    /// The operation failed with an ordinary error.
    Reject,
    /// The operation failed with a cancellation signal.
    RejectCancelled {
        /// Whether the handle was cancelled by [`Operation::Lock`].
        by_lock: bool,
    },
    /// The operation failed with an error that must reach the caller as-is.
    Fault,
}

/// Result of looking an operation up in the table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    /// Move to the given state.
    Enter(ActionState),
    /// Stay pending and cancel the in-flight handle; settlement decides the
    /// final state.
    Interrupt,
    /// Nothing to do.
    Skip,
    /// The operation is forbidden in the current state.
    Conflict {
        /// State the caller tried to reach.
        target: ActionState,
    },
    /// A cancellation signal arrived while nothing could be cancelled.
    UnexpectedAbort,
}

/// Look up what `operation` does when applied in state `from`.
///
/// # Example
///
/// ```rust
/// use modeler::core::{step, ActionState, Operation, Step};
///
/// assert_eq!(
///     step(ActionState::Ready, Operation::Exec),
///     Step::Enter(ActionState::Pending)
/// );
/// assert_eq!(
///     step(ActionState::Pending, Operation::Exec),
///     Step::Conflict { target: ActionState::Pending }
/// );
/// ```
pub fn step(from: ActionState, operation: Operation) -> Step {
    use ActionState::{Abort, Error, Lock, Pending, Ready};

    match (operation, from) {
        (Operation::Exec, Pending | Lock) => Step::Conflict { target: Pending },
        (Operation::Exec, _) => Step::Enter(Pending),

        (Operation::Lock, Pending) => Step::Interrupt,
        (Operation::Lock, _) => Step::Enter(Lock),

        (Operation::Unlock, Lock) => Step::Enter(Ready),
        (Operation::Unlock, _) => Step::Conflict { target: Ready },

        (Operation::ResetError, Error) => Step::Enter(Ready),
        (Operation::ResetError, _) => Step::Conflict { target: Ready },

        (Operation::Cancel, Pending) => Step::Interrupt,
        (Operation::Cancel, _) => Step::Skip,

        (Operation::Resolve, _) => Step::Enter(Ready),

        (Operation::Reject, Pending) => Step::Enter(Error),
        (Operation::Reject, _) => Step::Conflict { target: Error },

        (Operation::RejectCancelled { by_lock: true }, Pending | Lock) => Step::Enter(Lock),
        (Operation::RejectCancelled { by_lock: false }, Pending | Lock) => Step::Enter(Abort),
        (Operation::RejectCancelled { .. }, _) => Step::UnexpectedAbort,

        (Operation::Fault, _) => Step::Enter(Ready),
    }
}

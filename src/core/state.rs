//! The five states an action can be in.
//!
//! `ActionState` is a plain value: every method here is pure and cheap to
//! call from observers and UI bindings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single action.
///
/// `Ready` is the initial state. `Pending` is the only state in which the
/// underlying operation is in flight. `Error`, `Lock` and `Abort` stay put
/// until the action is explicitly reset, unlocked or re-executed.
///
/// # Example
///
/// ```rust
/// use modeler::core::ActionState;
///
/// let state = ActionState::Pending;
/// assert_eq!(state.name(), "pending");
/// assert!(state.is_in_flight());
/// assert!(!ActionState::Lock.is_in_flight());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    #[default]
    Ready,
    Pending,
    Error,
    Lock,
    Abort,
}

impl ActionState {
    /// Every state, in the order used for aggregate flag slots.
    pub const ALL: [ActionState; 5] = [
        ActionState::Ready,
        ActionState::Pending,
        ActionState::Error,
        ActionState::Lock,
        ActionState::Abort,
    ];

    /// Lowercase name used in messages and serialized snapshots.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Pending => "pending",
            Self::Error => "error",
            Self::Lock => "lock",
            Self::Abort => "abort",
        }
    }

    /// Position of this state in [`ActionState::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Ready => 0,
            Self::Pending => 1,
            Self::Error => 2,
            Self::Lock => 3,
            Self::Abort => 4,
        }
    }

    /// `true` only while the operation is running.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// `true` for states that hold until an explicit operation moves the
    /// action out of them.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::Error | Self::Lock | Self::Abort)
    }

    /// Membership test against a list of states.
    pub fn is_one_of(&self, states: &[ActionState]) -> bool {
        states.contains(self)
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

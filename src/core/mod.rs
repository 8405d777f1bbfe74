//! Pure building blocks of the action state machine.
//!
//! - `ActionState`: the five states an action can be in
//! - `step`: the transition table every action consults before mutating
//! - `ActionBits`: per-owner aggregate flags, one bit per action
//!
//! Nothing in this module holds shared state or performs side effects.

mod bits;
mod state;
mod transition;

pub use bits::{ActionBits, ActionId};
pub use state::ActionState;
pub use transition::{step, Operation, Step};

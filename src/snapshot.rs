//! Serializable views of actions and models.
//!
//! Snapshots capture what observers would see at one point in time. They do
//! NOT include promises, cancellation handles or the causes of captured
//! errors (only their messages), so they can be logged, stored or sent to a
//! UI layer as plain data.

use crate::core::{ActionId, ActionState};
use crate::model::ModelId;
use crate::AbortReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// State of one action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub id: ActionId,
    pub name: String,
    pub state: ActionState,
    /// Message of the captured error, while in `error`.
    pub error: Option<String>,
    /// Reason given to `cancel`, while in `abort`.
    pub abort_reason: Option<AbortReason>,
    /// Time of the last transition.
    pub updated_at: DateTime<Utc>,
}

/// State of every action a model has created so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Snapshot format version
    pub version: u32,

    pub model_id: ModelId,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Actions ordered by id
    pub actions: Vec<ActionSnapshot>,
}

impl ModelSnapshot {
    /// Snapshot of the action named `name`.
    pub fn action(&self, name: &str) -> Option<&ActionSnapshot> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// Names of the actions in `state`.
    pub fn in_state(&self, state: ActionState) -> Vec<&str> {
        self.actions
            .iter()
            .filter(|action| action.state == state)
            .map(|action| action.name.as_str())
            .collect()
    }
}

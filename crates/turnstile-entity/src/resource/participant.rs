//! Participant document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use turnstile_core::types::{ActorId, ResourceId};

/// Where an actor stands with respect to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    /// Never requested, or withdrew.
    #[default]
    NotRequested,
    /// Holds one of the resource's admission slots.
    Admitted,
    /// Queued behind the capacity limit.
    Waitlisted,
}

impl ParticipantState {
    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequested => "not_requested",
            Self::Admitted => "admitted",
            Self::Waitlisted => "waitlisted",
        }
    }
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One actor's standing on one resource.
///
/// Created on the actor's first request and mutated in place afterwards.
/// Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The resource.
    pub resource_id: ResourceId,
    /// The actor.
    pub actor_id: ActorId,
    /// Current state.
    pub state: ParticipantState,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

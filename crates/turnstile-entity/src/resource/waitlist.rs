//! Waitlist entry document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::types::{ActorId, ResourceId};

/// A queued actor.
///
/// Exists exactly while the actor is waitlisted. The position is assigned
/// once from the resource's waitlist sequence and is never reused, so live
/// positions are distinct but may have gaps after promotions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// The resource.
    pub resource_id: ResourceId,
    /// The queued actor.
    pub actor_id: ActorId,
    /// FIFO position, starting at 1.
    pub position: u64,
    /// When the actor was queued.
    pub enqueued_at: DateTime<Utc>,
}

//! Resource document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::types::ResourceId;

/// A resource with a fixed number of admission slots and a FIFO waitlist
/// for overflow (e.g. an event with a seat limit).
///
/// Committed states always satisfy `admitted_count <= capacity`, and
/// `waitlist_count` equals the number of live waitlist entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: ResourceId,
    /// Maximum number of admitted actors. Positive and immutable.
    pub capacity: u32,
    /// Actors currently admitted.
    pub admitted_count: u32,
    /// Live waitlist entries.
    pub waitlist_count: u32,
    /// Last allocated waitlist position. Never decreases.
    pub waitlist_sequence: u64,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// A fresh resource with no admissions and an empty waitlist.
    pub fn new(id: ResourceId, capacity: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            capacity,
            admitted_count: 0,
            waitlist_count: 0,
            waitlist_sequence: 0,
            created_at,
        }
    }

    /// Whether another actor can be admitted.
    pub fn has_capacity(&self) -> bool {
        self.admitted_count < self.capacity
    }
}

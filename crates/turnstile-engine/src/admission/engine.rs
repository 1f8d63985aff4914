//! Capacity reservation engine.
//!
//! A resource admits at most `capacity` actors. Requests past that point
//! are queued in allocation order. Promotion is lazy: a waitlisted actor
//! is admitted when it requests again and a slot is free. Withdrawals free
//! slots but never promote anyone on their own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use turnstile_core::error::AppError;
use turnstile_core::result::AppResult;
use turnstile_core::traits::Clock;
use turnstile_core::types::{ActorId, ResourceId};
use turnstile_entity::keys;
use turnstile_entity::resource::{Participant, ParticipantState, Resource, WaitlistEntry};
use turnstile_store::{Transaction, TransactionRunner};

use super::sequence::allocate_position;

/// Result of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AdmissionOutcome {
    /// The actor holds an admission slot.
    Admitted,
    /// The actor is queued at `position`.
    Waitlisted {
        /// FIFO position, unique within the resource.
        position: u64,
    },
}

impl AdmissionOutcome {
    /// The participant state this outcome corresponds to.
    pub fn state(&self) -> ParticipantState {
        match self {
            Self::Admitted => ParticipantState::Admitted,
            Self::Waitlisted { .. } => ParticipantState::Waitlisted,
        }
    }

    /// Waitlist position, if queued.
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::Admitted => None,
            Self::Waitlisted { position } => Some(*position),
        }
    }
}

/// Admits actors to capacity-bounded resources.
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    /// Transaction runner shared with the other engines.
    runner: Arc<TransactionRunner>,
    /// Time source for document timestamps.
    clock: Arc<dyn Clock>,
}

impl AdmissionEngine {
    /// Creates a new admission engine.
    pub fn new(runner: Arc<TransactionRunner>, clock: Arc<dyn Clock>) -> Self {
        Self { runner, clock }
    }

    /// Creates a resource with `capacity` admission slots.
    pub async fn create_resource(
        &self,
        resource_id: ResourceId,
        capacity: u32,
    ) -> Result<Resource, AppError> {
        resource_id.ensure_valid()?;
        if capacity == 0 {
            return Err(AppError::validation("Resource capacity must be positive"));
        }
        let now = self.clock.now();

        let resource = self
            .runner
            .transact("create_resource", |txn| {
                let key = keys::resource(resource_id);
                if txn.get::<Resource>(&key)?.is_some() {
                    return Err(AppError::conflict(format!(
                        "Resource {resource_id} already exists"
                    )));
                }
                let resource = Resource::new(resource_id, capacity, now);
                txn.put(key, &resource)?;
                Ok(resource)
            })
            .await?;

        info!(resource_id = %resource_id, capacity, "Resource created");
        Ok(resource)
    }

    /// Requests admission for `actor_id`.
    ///
    /// Admits the actor if a slot is free, otherwise queues it. Repeating
    /// the request is safe: an admitted actor stays admitted and a queued
    /// actor keeps its position unless a slot has opened up, in which case
    /// it is admitted and leaves the queue.
    pub async fn request_admission(
        &self,
        resource_id: ResourceId,
        actor_id: ActorId,
    ) -> Result<AdmissionOutcome, AppError> {
        resource_id.ensure_valid()?;
        actor_id.ensure_valid()?;
        let now = self.clock.now();

        let (outcome, changed) = self
            .runner
            .transact("request_admission", |txn| {
                admit_or_enqueue(txn, resource_id, actor_id, now)
            })
            .await?;

        if changed {
            match outcome {
                AdmissionOutcome::Admitted => {
                    info!(resource_id = %resource_id, actor_id = %actor_id, "Actor admitted");
                }
                AdmissionOutcome::Waitlisted { position } => {
                    info!(
                        resource_id = %resource_id,
                        actor_id = %actor_id,
                        position,
                        "Actor waitlisted"
                    );
                }
            }
        } else {
            debug!(resource_id = %resource_id, actor_id = %actor_id, ?outcome, "Repeat admission request");
        }
        Ok(outcome)
    }

    /// Withdraws `actor_id` from the resource and returns the state it left.
    ///
    /// An admitted actor gives its slot back; a queued actor leaves the
    /// queue. The freed slot goes to whoever requests next.
    pub async fn withdraw(
        &self,
        resource_id: ResourceId,
        actor_id: ActorId,
    ) -> Result<ParticipantState, AppError> {
        resource_id.ensure_valid()?;
        actor_id.ensure_valid()?;
        let now = self.clock.now();

        let previous = self
            .runner
            .transact("withdraw", |txn| release(txn, resource_id, actor_id, now))
            .await?;

        if previous != ParticipantState::NotRequested {
            info!(
                resource_id = %resource_id,
                actor_id = %actor_id,
                previous = %previous,
                "Actor withdrew"
            );
        }
        Ok(previous)
    }

    /// Reads a resource.
    pub async fn resource(&self, resource_id: ResourceId) -> AppResult<Resource> {
        resource_id.ensure_valid()?;
        self.runner
            .transact("get_resource", |txn| {
                txn.get::<Resource>(&keys::resource(resource_id))?
                    .ok_or_else(|| resource_not_found(resource_id))
            })
            .await
    }

    /// Reads an actor's state on a resource.
    pub async fn participant_state(
        &self,
        resource_id: ResourceId,
        actor_id: ActorId,
    ) -> AppResult<ParticipantState> {
        resource_id.ensure_valid()?;
        actor_id.ensure_valid()?;
        self.runner
            .transact("get_participant", |txn| {
                Ok(txn
                    .get::<Participant>(&keys::participant(resource_id, actor_id))?
                    .map(|p| p.state)
                    .unwrap_or_default())
            })
            .await
    }

    /// Lists the live waitlist of a resource in position order.
    pub async fn waitlist(&self, resource_id: ResourceId) -> AppResult<Vec<WaitlistEntry>> {
        resource_id.ensure_valid()?;
        let snapshot = self.runner.snapshot().await?;
        let mut entries = snapshot
            .scan_prefix(&keys::waitlist_prefix(resource_id))?
            .into_iter()
            .map(|(_, doc)| serde_json::from_value::<WaitlistEntry>(doc.body).map_err(AppError::from))
            .collect::<AppResult<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.position);
        Ok(entries)
    }
}

/// Transaction body of `request_admission`. Returns the outcome and
/// whether anything was written.
fn admit_or_enqueue(
    txn: &mut Transaction,
    resource_id: ResourceId,
    actor_id: ActorId,
    now: chrono::DateTime<chrono::Utc>,
) -> AppResult<(AdmissionOutcome, bool)> {
    let resource_key = keys::resource(resource_id);
    let participant_key = keys::participant(resource_id, actor_id);
    let entry_key = keys::waitlist_entry(resource_id, actor_id);

    let mut resource: Resource = txn
        .get(&resource_key)?
        .ok_or_else(|| resource_not_found(resource_id))?;
    let state = txn
        .get::<Participant>(&participant_key)?
        .map(|p| p.state)
        .unwrap_or_default();
    let entry: Option<WaitlistEntry> = txn.get(&entry_key)?;

    if state == ParticipantState::Admitted {
        return Ok((AdmissionOutcome::Admitted, false));
    }

    if resource.has_capacity() {
        resource.admitted_count += 1;
        if entry.is_some() {
            txn.delete(entry_key);
            resource.waitlist_count =
                decrement(resource.waitlist_count, "waitlist_count", resource_id)?;
        }
        txn.put(
            participant_key,
            &Participant {
                resource_id,
                actor_id,
                state: ParticipantState::Admitted,
                updated_at: now,
            },
        )?;
        txn.put(resource_key, &resource)?;
        return Ok((AdmissionOutcome::Admitted, true));
    }

    if let Some(entry) = entry {
        let outcome = AdmissionOutcome::Waitlisted {
            position: entry.position,
        };
        if state == ParticipantState::Waitlisted {
            return Ok((outcome, false));
        }
        txn.put(
            participant_key,
            &Participant {
                resource_id,
                actor_id,
                state: ParticipantState::Waitlisted,
                updated_at: now,
            },
        )?;
        return Ok((outcome, true));
    }

    let position = allocate_position(&mut resource)?;
    resource.waitlist_count = resource.waitlist_count.checked_add(1).ok_or_else(|| {
        AppError::internal(format!("waitlist_count overflow on resource {resource_id}"))
    })?;
    txn.put(
        entry_key,
        &WaitlistEntry {
            resource_id,
            actor_id,
            position,
            enqueued_at: now,
        },
    )?;
    txn.put(
        participant_key,
        &Participant {
            resource_id,
            actor_id,
            state: ParticipantState::Waitlisted,
            updated_at: now,
        },
    )?;
    txn.put(resource_key, &resource)?;
    Ok((AdmissionOutcome::Waitlisted { position }, true))
}

/// Transaction body of `withdraw`.
fn release(
    txn: &mut Transaction,
    resource_id: ResourceId,
    actor_id: ActorId,
    now: chrono::DateTime<chrono::Utc>,
) -> AppResult<ParticipantState> {
    let resource_key = keys::resource(resource_id);
    let participant_key = keys::participant(resource_id, actor_id);

    let mut resource: Resource = txn
        .get(&resource_key)?
        .ok_or_else(|| resource_not_found(resource_id))?;
    let state = txn
        .get::<Participant>(&participant_key)?
        .map(|p| p.state)
        .unwrap_or_default();

    match state {
        ParticipantState::NotRequested => return Ok(state),
        ParticipantState::Admitted => {
            resource.admitted_count =
                decrement(resource.admitted_count, "admitted_count", resource_id)?;
        }
        ParticipantState::Waitlisted => {
            let entry_key = keys::waitlist_entry(resource_id, actor_id);
            if txn.get::<WaitlistEntry>(&entry_key)?.is_some() {
                txn.delete(entry_key);
                resource.waitlist_count =
                    decrement(resource.waitlist_count, "waitlist_count", resource_id)?;
            }
        }
    }

    txn.put(
        participant_key,
        &Participant {
            resource_id,
            actor_id,
            state: ParticipantState::NotRequested,
            updated_at: now,
        },
    )?;
    txn.put(resource_key, &resource)?;
    Ok(state)
}

fn decrement(value: u32, field: &str, resource_id: ResourceId) -> AppResult<u32> {
    value.checked_sub(1).ok_or_else(|| {
        AppError::internal(format!("{field} underflow on resource {resource_id}"))
    })
}

fn resource_not_found(resource_id: ResourceId) -> AppError {
    AppError::not_found(format!("Resource {resource_id} does not exist"))
}

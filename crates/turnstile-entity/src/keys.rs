//! Document key builders for every document the engines touch.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the engines use. Documents that belong to a resource
//! nest under its key so they can be scanned by prefix.

use turnstile_core::traits::DocumentKey;
use turnstile_core::types::{ActorId, ResourceId, ResultId, TokenId};

use crate::idempotency::IdempotencyKey;

// ── Admission keys ─────────────────────────────────────────

/// Key of a resource document.
pub fn resource(resource_id: ResourceId) -> DocumentKey {
    DocumentKey::new(format!("resource/{resource_id}"))
}

/// Key of the participant document for an actor on a resource.
pub fn participant(resource_id: ResourceId, actor_id: ActorId) -> DocumentKey {
    DocumentKey::new(format!("resource/{resource_id}/participant/{actor_id}"))
}

/// Key of the waitlist entry for an actor on a resource.
pub fn waitlist_entry(resource_id: ResourceId, actor_id: ActorId) -> DocumentKey {
    DocumentKey::new(format!("resource/{resource_id}/waitlist/{actor_id}"))
}

/// Prefix shared by every waitlist entry of a resource.
pub fn waitlist_prefix(resource_id: ResourceId) -> String {
    format!("resource/{resource_id}/waitlist/")
}

// ── Idempotency keys ───────────────────────────────────────

/// Key of the idempotency record guarding an operation.
pub fn idempotency_record(key: &IdempotencyKey) -> DocumentKey {
    DocumentKey::new(format!("idempotency/{}", key.as_str()))
}

/// Key of the side-effecting record produced by a guarded operation.
pub fn guarded_operation(result_id: ResultId) -> DocumentKey {
    DocumentKey::new(format!("operation/{result_id}"))
}

// ── Token keys ─────────────────────────────────────────────

/// Key of a redeemable token.
pub fn token(token_id: TokenId) -> DocumentKey {
    DocumentKey::new(format!("token/{token_id}"))
}

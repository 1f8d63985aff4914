//! Waitlist position allocation.
//!
//! Positions come from the `waitlist_sequence` counter stored on the
//! resource document itself, so the allocation commits or rolls back with
//! the enqueue that uses it. Two transactions that both allocate from the
//! same counter both write the resource, and the store lets only one of
//! them commit.

use turnstile_core::error::AppError;
use turnstile_core::result::AppResult;
use turnstile_entity::resource::Resource;

/// Advance the resource's waitlist sequence and return the new position.
pub fn allocate_position(resource: &mut Resource) -> AppResult<u64> {
    let next = resource.waitlist_sequence.checked_add(1).ok_or_else(|| {
        AppError::internal(format!(
            "Waitlist sequence exhausted for resource {}",
            resource.id
        ))
    })?;
    resource.waitlist_sequence = next;
    Ok(next)
}

//! Ownership checks shared by every mutating service.

/// Whether `actor_id` may modify or delete a resource owned by `owner_id`.
///
/// Admins may modify anything; everybody else only what they own.
#[must_use]
pub fn can_modify(actor_id: &str, owner_id: &str, is_admin: bool) -> bool {
    is_admin || (!actor_id.is_empty() && actor_id == owner_id)
}

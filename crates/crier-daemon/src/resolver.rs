use crier_store::{ItemStatus, QueueItem, QueueStore, StoreError};

/// blocked_reason values written when a comment cannot proceed.
pub const PARENT_MISSING: &str = "parent_missing";
pub const PARENT_FAILED: &str = "parent_failed";
pub const PARENT_NOT_YET_PUBLISHED: &str = "parent_not_yet_published";
pub const PARENT_MISSING_IDENTIFIER: &str = "parent_missing_identifier";

/// Whether a due comment can be published right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Parent is published; carries the parent's external id.
    Ready(String),
    /// Parent is still pending — a wait condition, not an error. The
    /// comment stays pending and is re-evaluated next tick.
    Deferred(&'static str),
    /// No amount of waiting will resolve this — mark the comment failed.
    Blocked(&'static str),
}

/// Classify a comment against a snapshot of its parent.
///
/// Pure on the snapshot: the same parent state always yields the same
/// answer. Terminal conditions are checked before the transient one, so a
/// missing or failed parent is never misreported as a wait.
pub fn assess(parent: Option<&QueueItem>) -> Readiness {
    match parent {
        None => Readiness::Blocked(PARENT_MISSING),
        Some(parent) => match parent.status {
            ItemStatus::Failed => Readiness::Blocked(PARENT_FAILED),
            ItemStatus::Pending => Readiness::Deferred(PARENT_NOT_YET_PUBLISHED),
            ItemStatus::Published => match &parent.external_id {
                // Published-without-id should not happen, but a comment must
                // not attach to nothing.
                None => Readiness::Blocked(PARENT_MISSING_IDENTIFIER),
                Some(external_id) => Readiness::Ready(external_id.clone()),
            },
        },
    }
}

/// Look up the comment's parent in the store and classify it.
///
/// A parent that was pruned after the comment was created shows up here as
/// not-found and is treated as permanently missing.
pub fn resolve(store: &QueueStore, comment: &QueueItem) -> Result<Readiness, StoreError> {
    let Some(parent_uuid) = &comment.parent_uuid else {
        return Ok(Readiness::Blocked(PARENT_MISSING));
    };
    match store.get_by_uuid(parent_uuid) {
        Ok(parent) => Ok(assess(Some(&parent))),
        Err(StoreError::NotFound { .. }) => Ok(Readiness::Blocked(PARENT_MISSING)),
        Err(e) => Err(e),
    }
}

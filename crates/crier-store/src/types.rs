use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a queue item publishes: a standalone post, or a comment attached to
/// a previously published post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Post,
    Comment,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemKind::Post => "post",
            ItemKind::Comment => "comment",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "post" => Ok(ItemKind::Post),
            "comment" => Ok(ItemKind::Comment),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

/// Lifecycle state of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for its publish_at time (or for its parent, if a comment).
    Pending,
    /// Sent to the platform; terminal.
    Published,
    /// Publish failed or the dependency is permanently blocked; terminal.
    Failed,
}

impl ItemStatus {
    /// Terminal states admit no further status transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Published | ItemStatus::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Published => "published",
            ItemStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "published" => Ok(ItemStatus::Published),
            "failed" => Ok(ItemStatus::Failed),
            other => Err(format!("unknown item status: {other}")),
        }
    }
}

/// A persisted queue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Storage-assigned rowid. Internal to the store; never reused.
    pub id: i64,
    /// Stable identifier, the only key safe to hold across restarts.
    pub uuid: String,
    /// Post or comment. Immutable after creation.
    pub kind: ItemKind,
    /// Target platform identifier (e.g. "linkedin").
    pub provider: String,
    /// Acting account identifier.
    pub author: String,
    /// Opaque locator for the content, typically a file path.
    pub content_ref: String,
    /// When the item becomes due.
    pub publish_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: ItemStatus,
    /// Platform-assigned identifier, set once on successful publish.
    pub external_id: Option<String>,
    /// For comments, the uuid of the parent post.
    pub parent_uuid: Option<String>,
    /// Human-readable diagnostic when failed or blocked.
    pub blocked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when scheduling a new item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub kind: ItemKind,
    pub provider: String,
    pub author: String,
    pub content_ref: String,
    pub publish_at: DateTime<Utc>,
    /// Required for comments, forbidden for posts.
    pub parent_uuid: Option<String>,
    /// Caller-supplied uuid; generated when absent.
    pub uuid: Option<String>,
}

/// Partial update applied to an existing item.
///
/// Only the listed fields can be mutated after creation; everything else is
/// fixed at scheduling time. `updated_at` is bumped on every apply.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatch {
    pub status: Option<ItemStatus>,
    pub external_id: Option<String>,
    pub blocked_reason: Option<String>,
}

impl UpdatePatch {
    /// Mark an item published with its platform-assigned identifier.
    pub fn published(external_id: impl Into<String>) -> Self {
        Self {
            status: Some(ItemStatus::Published),
            external_id: Some(external_id.into()),
            blocked_reason: None,
        }
    }

    /// Mark an item failed with a diagnostic reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Some(ItemStatus::Failed),
            external_id: None,
            blocked_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_roundtrips_through_strings() {
        for kind in [ItemKind::Post, ItemKind::Comment] {
            assert_eq!(ItemKind::from_str(&kind.to_string()).unwrap(), kind);
        }
        assert!(ItemKind::from_str("repost").is_err());
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [ItemStatus::Pending, ItemStatus::Published, ItemStatus::Failed] {
            assert_eq!(ItemStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert!(ItemStatus::from_str("missed").is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!ItemStatus::Pending.is_terminal());
        assert!(ItemStatus::Published.is_terminal());
        assert!(ItemStatus::Failed.is_terminal());
    }
}

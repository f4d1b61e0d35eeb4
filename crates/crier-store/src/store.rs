use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crier_core::config::MIN_COMMENT_OFFSET_MINS;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::{ItemKind, ItemStatus, NewItem, QueueItem, UpdatePatch};

/// Shared SELECT prefix so every query maps columns identically.
const ITEM_SELECT: &str = "SELECT id, uuid, kind, provider, author, content_ref, publish_at,
        status, external_id, parent_uuid, blocked_reason, created_at, updated_at
 FROM queue";

/// Thread-safe handle to the scheduling queue.
///
/// Wraps a single SQLite connection in a `Mutex`; every public method holds
/// the lock for the duration of one logical operation and releases it on
/// all exit paths. Read-modify-write operations run inside a transaction,
/// so a daemon tick and a concurrent CLI process never interleave. The
/// lock is never held across a publish call — callers publish first, then
/// apply the outcome through a short `update`.
pub struct QueueStore {
    db: Mutex<Connection>,
}

impl QueueStore {
    /// Wrap an already-open connection, initialising the schema.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the queue database at `path`.
    ///
    /// Any failure to open, configure, or migrate the file is reported as
    /// [`StoreError::Corrupt`]: the daemon must refuse to start rather than
    /// run against a partial store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // Best effort — Connection::open reports the real problem if the
        // directory still doesn't exist.
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;

        init_db(&conn).map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Schedule a new item. Returns the fully populated row.
    ///
    /// Validates the kind/parent invariants and, for comments, the
    /// minimum-offset rule against the parent's publish time. The parent
    /// must exist at creation time; it is not re-checked afterwards.
    pub fn create(&self, new: NewItem) -> Result<QueueItem> {
        match (new.kind, &new.parent_uuid) {
            (ItemKind::Comment, None) => {
                return Err(StoreError::Validation(
                    "a comment requires parent_uuid".to_string(),
                ))
            }
            (ItemKind::Post, Some(_)) => {
                return Err(StoreError::Validation(
                    "a post must not have parent_uuid".to_string(),
                ))
            }
            _ => {}
        }

        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction()?;

        if let Some(parent_uuid) = &new.parent_uuid {
            let parent_publish_at: String = tx
                .query_row(
                    "SELECT publish_at FROM queue WHERE uuid = ?1",
                    [parent_uuid],
                    |row| row.get(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StoreError::Validation(format!(
                        "parent {parent_uuid} does not exist"
                    )),
                    other => StoreError::Database(other),
                })?;
            let parent_publish_at = parse_ts_str(&parent_publish_at)?;
            let earliest = parent_publish_at + Duration::minutes(MIN_COMMENT_OFFSET_MINS);
            if new.publish_at < earliest {
                return Err(StoreError::Validation(format!(
                    "comment must be scheduled at least {MIN_COMMENT_OFFSET_MINS} minutes \
                     after its parent (earliest {earliest})"
                )));
            }
        }

        let uuid = new
            .uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        tx.execute(
            "INSERT INTO queue
             (uuid, kind, provider, author, content_ref, publish_at,
              status, external_id, parent_uuid, blocked_reason, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,'pending',NULL,?7,NULL,?8,?8)",
            rusqlite::params![
                uuid,
                new.kind.to_string(),
                new.provider,
                new.author,
                new.content_ref,
                new.publish_at.to_rfc3339(),
                new.parent_uuid,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Validation(format!("uuid {uuid} already exists"))
            }
            other => StoreError::Database(other),
        })?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(item_uuid = %uuid, kind = %new.kind, publish_at = %new.publish_at, "item scheduled");

        Ok(QueueItem {
            id,
            uuid,
            kind: new.kind,
            provider: new.provider,
            author: new.author,
            content_ref: new.content_ref,
            publish_at: new.publish_at,
            status: ItemStatus::Pending,
            external_id: None,
            parent_uuid: new.parent_uuid,
            blocked_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Look up an item by uuid. Absence is an error, never an empty success.
    pub fn get_by_uuid(&self, uuid: &str) -> Result<QueueItem> {
        let conn = self.db.lock().unwrap();
        match conn.query_row(&format!("{ITEM_SELECT} WHERE uuid = ?1"), [uuid], row_to_item) {
            Ok(item) => Ok(item),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound {
                uuid: uuid.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Pending items of `kind` whose publish_at has passed, earliest first.
    ///
    /// Ties on publish_at break by id ascending, so the order is stable
    /// across ticks and a parent never sorts after its same-instant sibling.
    pub fn list_due(&self, kind: ItemKind, now: DateTime<Utc>) -> Result<Vec<QueueItem>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{ITEM_SELECT}
             WHERE kind = ?1 AND status = 'pending' AND publish_at <= ?2
             ORDER BY publish_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![kind.to_string(), now.to_rfc3339()],
            row_to_item,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Apply a partial update to the item with `uuid`.
    ///
    /// All-or-nothing: the read, the invariant checks, and the write happen
    /// inside one transaction. Rejected updates leave the row untouched.
    pub fn update(&self, uuid: &str, patch: UpdatePatch) -> Result<QueueItem> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction()?;

        let current = match tx.query_row(&format!("{ITEM_SELECT} WHERE uuid = ?1"), [uuid], row_to_item)
        {
            Ok(item) => item,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(StoreError::NotFound {
                    uuid: uuid.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(next) = patch.status {
            if current.status.is_terminal() && next != current.status {
                return Err(StoreError::Validation(format!(
                    "item {uuid} is {} and cannot become {next}",
                    current.status
                )));
            }
        }
        if patch.external_id.is_some() {
            if current.external_id.is_some() {
                return Err(StoreError::Validation(format!(
                    "item {uuid} already has an external_id"
                )));
            }
            if patch.status != Some(ItemStatus::Published) {
                return Err(StoreError::Validation(
                    "external_id may only be set when publishing".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let status = patch.status.unwrap_or(current.status);
        let external_id = patch.external_id.or_else(|| current.external_id.clone());
        let blocked_reason = patch.blocked_reason.or_else(|| current.blocked_reason.clone());

        tx.execute(
            "UPDATE queue
             SET status = ?1, external_id = ?2, blocked_reason = ?3, updated_at = ?4
             WHERE uuid = ?5",
            rusqlite::params![
                status.to_string(),
                external_id,
                blocked_reason,
                now.to_rfc3339(),
                uuid
            ],
        )?;
        tx.commit()?;

        Ok(QueueItem {
            status,
            external_id,
            blocked_reason,
            updated_at: now,
            ..current
        })
    }

    /// All comments referencing `parent_uuid`, in due order.
    pub fn list_comments_for(&self, parent_uuid: &str) -> Result<Vec<QueueItem>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{ITEM_SELECT}
             WHERE kind = 'comment' AND parent_uuid = ?1
             ORDER BY publish_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map([parent_uuid], row_to_item)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Every item in the queue, newest publish time first.
    pub fn list_all(&self) -> Result<Vec<QueueItem>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(&format!("{ITEM_SELECT} ORDER BY publish_at DESC, id DESC"))?;
        let rows = stmt.query_map([], row_to_item)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

/// Map a SELECT row (column order from ITEM_SELECT) to a QueueItem.
/// Centralised here so every query in this crate stays consistent.
fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
    let kind: String = row.get(2)?;
    let kind = kind
        .parse()
        .map_err(|e: String| bad_column(2, e))?;
    let status: String = row.get(7)?;
    let status = status
        .parse()
        .map_err(|e: String| bad_column(7, e))?;

    Ok(QueueItem {
        id: row.get(0)?,
        uuid: row.get(1)?,
        kind,
        provider: row.get(3)?,
        author: row.get(4)?,
        content_ref: row.get(5)?,
        publish_at: parse_ts(6, row.get(6)?)?,
        status,
        external_id: row.get(8)?,
        parent_uuid: row.get(9)?,
        blocked_reason: row.get(10)?,
        created_at: parse_ts(11, row.get(11)?)?,
        updated_at: parse_ts(12, row.get(12)?)?,
    })
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, e.to_string()))
}

fn parse_ts_str(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {s}: {e}")))
}

fn bad_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> QueueStore {
        QueueStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn post_at(publish_at: DateTime<Utc>) -> NewItem {
        NewItem {
            kind: ItemKind::Post,
            provider: "linkedin".to_string(),
            author: "@tester".to_string(),
            content_ref: "/tmp/post.md".to_string(),
            publish_at,
            parent_uuid: None,
            uuid: None,
        }
    }

    fn comment_at(publish_at: DateTime<Utc>, parent_uuid: &str) -> NewItem {
        NewItem {
            kind: ItemKind::Comment,
            provider: "linkedin".to_string(),
            author: "@tester".to_string(),
            content_ref: "/tmp/comment.md".to_string(),
            publish_at,
            parent_uuid: Some(parent_uuid.to_string()),
            uuid: None,
        }
    }

    #[test]
    fn create_then_get_roundtrips() {
        let store = memory_store();
        let at = Utc::now();
        let created = store.create(post_at(at)).unwrap();

        let fetched = store.get_by_uuid(&created.uuid).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.uuid, created.uuid);
        assert_eq!(fetched.kind, ItemKind::Post);
        assert_eq!(fetched.provider, "linkedin");
        assert_eq!(fetched.status, ItemStatus::Pending);
        assert_eq!(fetched.external_id, None);
        assert_eq!(fetched.publish_at.timestamp(), at.timestamp());
    }

    #[test]
    fn get_unknown_uuid_is_not_found() {
        let store = memory_store();
        assert!(matches!(
            store.get_by_uuid("nope"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn comment_without_parent_is_rejected() {
        let store = memory_store();
        let mut new = comment_at(Utc::now(), "x");
        new.parent_uuid = None;
        assert!(matches!(
            store.create(new),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn post_with_parent_is_rejected() {
        let store = memory_store();
        let mut new = post_at(Utc::now());
        new.parent_uuid = Some("x".to_string());
        assert!(matches!(
            store.create(new),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn comment_with_dangling_parent_is_rejected() {
        let store = memory_store();
        assert!(matches!(
            store.create(comment_at(Utc::now(), "no-such-uuid")),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn comment_too_soon_after_parent_is_rejected() {
        let store = memory_store();
        let base = Utc::now();
        let parent = store.create(post_at(base)).unwrap();

        let too_soon = base + Duration::minutes(MIN_COMMENT_OFFSET_MINS) - Duration::seconds(1);
        assert!(matches!(
            store.create(comment_at(too_soon, &parent.uuid)),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn comment_at_exact_offset_boundary_is_accepted() {
        let store = memory_store();
        let base = Utc::now();
        let parent = store.create(post_at(base)).unwrap();

        let boundary = base + Duration::minutes(MIN_COMMENT_OFFSET_MINS);
        let comment = store.create(comment_at(boundary, &parent.uuid)).unwrap();
        assert_eq!(comment.parent_uuid.as_deref(), Some(parent.uuid.as_str()));
    }

    #[test]
    fn duplicate_supplied_uuid_is_rejected() {
        let store = memory_store();
        let mut first = post_at(Utc::now());
        first.uuid = Some("fixed".to_string());
        store.create(first).unwrap();

        let mut second = post_at(Utc::now());
        second.uuid = Some("fixed".to_string());
        assert!(matches!(
            store.create(second),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn list_due_orders_by_publish_at_then_id() {
        let store = memory_store();
        let base = Utc::now() - Duration::hours(1);
        let later = store.create(post_at(base + Duration::minutes(10))).unwrap();
        let early_a = store.create(post_at(base)).unwrap();
        let early_b = store.create(post_at(base)).unwrap();

        let due = store.list_due(ItemKind::Post, Utc::now()).unwrap();
        let uuids: Vec<_> = due.iter().map(|i| i.uuid.as_str()).collect();
        assert_eq!(
            uuids,
            vec![early_a.uuid.as_str(), early_b.uuid.as_str(), later.uuid.as_str()]
        );
    }

    #[test]
    fn list_due_skips_future_and_non_pending() {
        let store = memory_store();
        let now = Utc::now();
        let due = store.create(post_at(now - Duration::minutes(1))).unwrap();
        store.create(post_at(now + Duration::hours(1))).unwrap();
        let done = store.create(post_at(now - Duration::minutes(2))).unwrap();
        store
            .update(&done.uuid, UpdatePatch::published("ext-1"))
            .unwrap();

        let listed = store.list_due(ItemKind::Post, now).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uuid, due.uuid);
    }

    #[test]
    fn publish_update_sets_external_id_once() {
        let store = memory_store();
        let item = store.create(post_at(Utc::now())).unwrap();

        let updated = store
            .update(&item.uuid, UpdatePatch::published("urn:li:123"))
            .unwrap();
        assert_eq!(updated.status, ItemStatus::Published);
        assert_eq!(updated.external_id.as_deref(), Some("urn:li:123"));

        // Terminal status and write-once external_id both hold.
        assert!(store
            .update(&item.uuid, UpdatePatch::failed("should not happen"))
            .is_err());
        let fetched = store.get_by_uuid(&item.uuid).unwrap();
        assert_eq!(fetched.external_id.as_deref(), Some("urn:li:123"));
    }

    #[test]
    fn external_id_requires_published_status() {
        let store = memory_store();
        let item = store.create(post_at(Utc::now())).unwrap();
        let patch = UpdatePatch {
            status: None,
            external_id: Some("urn:li:9".to_string()),
            blocked_reason: None,
        };
        assert!(matches!(
            store.update(&item.uuid, patch),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn update_unknown_uuid_is_not_found() {
        let store = memory_store();
        assert!(matches!(
            store.update("ghost", UpdatePatch::failed("x")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn rejected_update_leaves_row_untouched() {
        let store = memory_store();
        let item = store.create(post_at(Utc::now())).unwrap();
        store
            .update(&item.uuid, UpdatePatch::published("ext-1"))
            .unwrap();

        let patch = UpdatePatch {
            status: Some(ItemStatus::Failed),
            external_id: None,
            blocked_reason: Some("nope".to_string()),
        };
        assert!(store.update(&item.uuid, patch).is_err());

        let fetched = store.get_by_uuid(&item.uuid).unwrap();
        assert_eq!(fetched.status, ItemStatus::Published);
        assert_eq!(fetched.blocked_reason, None);
    }

    #[test]
    fn list_comments_for_filters_by_parent() {
        let store = memory_store();
        let base = Utc::now();
        let parent_a = store.create(post_at(base)).unwrap();
        let parent_b = store.create(post_at(base)).unwrap();
        let offset = Duration::minutes(MIN_COMMENT_OFFSET_MINS);
        let c1 = store
            .create(comment_at(base + offset, &parent_a.uuid))
            .unwrap();
        store
            .create(comment_at(base + offset, &parent_b.uuid))
            .unwrap();

        let comments = store.list_comments_for(&parent_a.uuid).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].uuid, c1.uuid);
    }

    #[test]
    fn legacy_rows_are_queryable_by_backfilled_uuid() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE queue (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                provider    TEXT NOT NULL,
                author      TEXT NOT NULL,
                content_ref TEXT NOT NULL,
                publish_at  TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );
            INSERT INTO queue (provider, author, content_ref, publish_at, status, created_at, updated_at)
            VALUES ('linkedin', '@legacy', '/tmp/p.md', '2024-01-01T00:00:00+00:00', 'pending',
                    '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');",
        )
        .unwrap();

        let store = QueueStore::new(conn).unwrap();
        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, ItemKind::Post);
        assert_eq!(all[0].blocked_reason, None);

        let fetched = store.get_by_uuid(&all[0].uuid).unwrap();
        assert_eq!(fetched.id, all[0].id);
        assert_eq!(fetched.author, "@legacy");
    }
}

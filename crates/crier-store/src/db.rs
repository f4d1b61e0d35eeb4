use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// Initialise the queue schema in `conn`.
///
/// Safe to call on every startup: table creation is idempotent, and
/// databases written by older versions are upgraded in place — missing
/// columns are added and absent uuids backfilled, so no offline migration
/// step is ever needed.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_queue_table(conn)?;
    upgrade_legacy_columns(conn)?;
    backfill_uuids(conn)?;
    create_indexes(conn)?;
    Ok(())
}

fn create_queue_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS queue (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid            TEXT,               -- backfilled for legacy rows
            kind            TEXT    NOT NULL DEFAULT 'post',
            provider        TEXT    NOT NULL,
            author          TEXT    NOT NULL,
            content_ref     TEXT    NOT NULL,
            publish_at      TEXT    NOT NULL,   -- RFC 3339 UTC
            status          TEXT    NOT NULL DEFAULT 'pending',
            external_id     TEXT,               -- set once, on publish
            parent_uuid     TEXT,               -- comments only
            blocked_reason  TEXT,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Columns added after the first released schema, with their ALTER clauses.
/// Order matters only for readability; each is applied independently.
const UPGRADE_COLUMNS: &[(&str, &str)] = &[
    ("uuid", "uuid TEXT"),
    ("kind", "kind TEXT NOT NULL DEFAULT 'post'"),
    ("external_id", "external_id TEXT"),
    ("parent_uuid", "parent_uuid TEXT"),
    ("blocked_reason", "blocked_reason TEXT"),
];

/// Add any column the on-disk table predates.
///
/// The first schema only knew provider/author/content_ref/publish_at/status;
/// everything a newer field needs defaults to NULL (or 'post' for kind),
/// which matches the semantics those rows had when written.
fn upgrade_legacy_columns(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(queue)")?;
    let existing: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();

    for (name, decl) in UPGRADE_COLUMNS {
        if !existing.iter().any(|c| c == name) {
            conn.execute_batch(&format!("ALTER TABLE queue ADD COLUMN {decl};"))?;
            info!(column = name, "queue schema upgraded");
        }
    }
    Ok(())
}

/// Assign a fresh uuid to every row that predates the uuid column, so
/// `get_by_uuid` works for legacy rows from the first query after upgrade.
fn backfill_uuids(conn: &Connection) -> Result<()> {
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM queue WHERE uuid IS NULL")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        rows
    };

    for id in &ids {
        conn.execute(
            "UPDATE queue SET uuid = ?1 WHERE id = ?2",
            rusqlite::params![Uuid::new_v4().to_string(), id],
        )?;
    }
    if !ids.is_empty() {
        info!(count = ids.len(), "legacy rows assigned uuids");
    }
    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    // idx_queue_uuid makes get_by_uuid O(1) and enforces uuid uniqueness;
    // idx_queue_due serves the polling query (status + publish_at range).
    conn.execute_batch(
        "
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_uuid ON queue (uuid);
        CREATE INDEX IF NOT EXISTS idx_queue_due ON queue (status, publish_at);
        CREATE INDEX IF NOT EXISTS idx_queue_parent ON queue (parent_uuid);
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }

    #[test]
    fn legacy_table_gains_columns_and_uuids() {
        let conn = Connection::open_in_memory().unwrap();
        // First released schema: no uuid/kind/external_id/parent_uuid/blocked_reason.
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

        init_db(&conn).unwrap();

        let (uuid, kind): (Option<String>, String) = conn
            .query_row("SELECT uuid, kind FROM queue WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert!(uuid.is_some(), "legacy row should have a backfilled uuid");
        assert_eq!(kind, "post");
    }
}

//! `crier-store` — the durable scheduling queue.
//!
//! # Overview
//!
//! Items are persisted to a SQLite `queue` table, one row per scheduled
//! post or comment. The [`store::QueueStore`] wraps a single connection and
//! serialises every logical operation, so a daemon tick and a concurrent
//! CLI invocation never interleave a read-modify-write.
//!
//! # Lifecycle
//!
//! | Status      | Meaning                                         |
//! |-------------|-------------------------------------------------|
//! | `pending`   | Waiting for its publish_at time                 |
//! | `published` | Sent to the platform; external_id recorded      |
//! |  `failed`   | Publish failed or dependency permanently blocked |
//!
//! `published` and `failed` are terminal. A comment waiting on its parent
//! stays `pending` with no `blocked_reason` and is re-evaluated every tick.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::QueueStore;
pub use types::{ItemKind, ItemStatus, NewItem, QueueItem, UpdatePatch};

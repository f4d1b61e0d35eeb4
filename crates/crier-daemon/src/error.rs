use thiserror::Error;

/// Errors that abort a whole tick (as opposed to per-item failures, which
/// are absorbed into the items' rows and never raised here).
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The queue store failed at the operation level — listing due work or
    /// resolving a dependency. Per-item outcome writes are not included;
    /// those are logged and skipped.
    #[error("Store error: {0}")]
    Store(#[from] crier_store::StoreError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

use thiserror::Error;

/// Wiring-level errors shared across the workspace.
///
/// Subsystems carry their own error enums (`StoreError`, `PublishError`,
/// …); this type covers the concerns that belong to no single crate.
#[derive(Debug, Error)]
pub enum CrierError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CrierError>;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PublishError;

/// One unit of content handed to a publisher.
#[derive(Debug, Clone, Serialize)]
pub struct PublishRequest {
    /// Target platform identifier (e.g. "linkedin").
    pub provider: String,
    /// Acting account identifier.
    pub author: String,
    /// The text to publish.
    pub content: String,
    /// For comments, the platform id of the post to attach to.
    pub parent_id: Option<String>,
}

/// Common interface for all publishing backends.
///
/// Implementations must not retry internally beyond their own transport
/// policy — the scheduling engine treats any error as a terminal failure
/// for the item being published.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher name for logging and error messages.
    fn name(&self) -> &str;

    /// Publish the request, returning the platform-assigned identifier.
    async fn publish(&self, req: &PublishRequest) -> Result<String, PublishError>;
}

/// Placeholder used when no publishing endpoint is configured.
///
/// Lets the daemon start (scheduling and queue inspection keep working)
/// while every publish attempt fails with a pointer to the config.
pub struct NullPublisher;

#[async_trait]
impl Publisher for NullPublisher {
    fn name(&self) -> &str {
        "null"
    }

    async fn publish(&self, _req: &PublishRequest) -> Result<String, PublishError> {
        Err(PublishError::Unavailable(
            "no publisher configured — set publisher.endpoint in crier.toml".to_string(),
        ))
    }
}

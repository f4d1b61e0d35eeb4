//! `crier-provider` — the collaborators the scheduling engine publishes
//! through: the [`Publisher`] trait with its HTTP and null implementations,
//! and the [`ContentSource`] trait that turns a content_ref into text.
//!
//! Platform specifics (OAuth, markdown rendering, rate limits) live behind
//! these seams; the engine only sees "publish this, give me an id back".

pub mod content;
pub mod error;
pub mod http;
pub mod publisher;

pub use content::{ContentSource, FileContentSource};
pub use error::{ContentError, PublishError};
pub use http::HttpPublisher;
pub use publisher::{NullPublisher, PublishRequest, Publisher};

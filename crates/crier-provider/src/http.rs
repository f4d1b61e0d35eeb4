use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::PublishError;
use crate::publisher::{PublishRequest, Publisher};

/// Publishes by POSTing the request as JSON to a configured endpoint.
///
/// The endpoint is expected to answer `{"id": "<platform id>"}` on success.
/// This keeps platform plumbing (gateway services, relay bots, test
/// harnesses) on the far side of a plain HTTP contract.
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: String,
}

impl HttpPublisher {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
        }
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    fn name(&self) -> &str {
        "http"
    }

    async fn publish(&self, req: &PublishRequest) -> Result<String, PublishError> {
        debug!(provider = %req.provider, author = %req.author, "sending publish request");

        let builder = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(req);

        let resp = self.apply_auth(builder).send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PublishError::Api { status, message });
        }

        let parsed: PublishResponse = resp
            .json()
            .await
            .map_err(|e| PublishError::Parse(e.to_string()))?;

        if parsed.id.is_empty() {
            return Err(PublishError::Parse(
                "publish response carried an empty id".to_string(),
            ));
        }
        Ok(parsed.id)
    }
}

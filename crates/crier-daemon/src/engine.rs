use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crier_provider::{ContentSource, PublishRequest, Publisher};
use crier_store::{ItemKind, QueueItem, QueueStore, UpdatePatch};

use crate::clock::Clock;
use crate::error::Result;
use crate::resolver::{self, Readiness};

/// Core scheduler: polls the queue and drives publication of due items.
///
/// Per-item failures (content missing, publish rejected, dependency
/// blocked) are recorded on the item and never abort the tick; only a
/// store-level failure surfaces as a tick error.
pub struct SchedulerEngine {
    store: Arc<QueueStore>,
    publisher: Arc<dyn Publisher>,
    content: Arc<dyn ContentSource>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<QueueStore>,
        publisher: Arc<dyn Publisher>,
        content: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            content,
            clock,
            interval,
        }
    }

    /// Main event loop. Polls at the configured interval until `shutdown`
    /// broadcasts `true`.
    ///
    /// Shutdown is cooperative: it is only observed between ticks, so an
    /// in-flight tick always finishes and no outcome write is cut short.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            publisher = self.publisher.name(),
            interval_secs = self.interval.as_secs(),
            "scheduler engine started"
        );

        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Process due items once without entering the loop.
    pub async fn run_once(&self) -> Result<()> {
        self.tick().await
    }

    /// One poll cycle: all due posts first, then all due comments, each in
    /// due order. Comments see the post outcomes from the same tick.
    async fn tick(&self) -> Result<()> {
        let now = self.clock.now();
        self.process_posts(now).await?;
        self.process_comments(now).await?;
        Ok(())
    }

    async fn process_posts(&self, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let due = self.store.list_due(ItemKind::Post, now)?;
        if due.is_empty() {
            return Ok(());
        }
        info!(count = due.len(), "posts due for publishing");
        for item in due {
            self.publish_item(&item, None).await;
        }
        Ok(())
    }

    async fn process_comments(&self, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let due = self.store.list_due(ItemKind::Comment, now)?;
        if due.is_empty() {
            return Ok(());
        }
        info!(count = due.len(), "comments due for processing");
        for item in due {
            match resolver::resolve(&self.store, &item)? {
                Readiness::Ready(parent_external_id) => {
                    self.publish_item(&item, Some(parent_external_id)).await;
                }
                Readiness::Deferred(reason) => {
                    // Not an error — the parent just hasn't run yet. The
                    // comment stays pending and is re-evaluated next tick.
                    info!(item_uuid = %item.uuid, reason, "comment deferred");
                }
                Readiness::Blocked(reason) => {
                    warn!(item_uuid = %item.uuid, reason, "comment permanently blocked");
                    self.apply_outcome(&item, UpdatePatch::failed(reason));
                }
            }
        }
        Ok(())
    }

    /// Resolve content, publish, and record the outcome on the item.
    ///
    /// The store lock is never held across the publish call — the outcome
    /// is applied through a short, separately-locked update afterwards.
    async fn publish_item(&self, item: &QueueItem, parent_id: Option<String>) {
        let content = match self.content.resolve(&item.content_ref) {
            Ok(content) => content,
            Err(e) => {
                error!(item_uuid = %item.uuid, content_ref = %item.content_ref, "content resolution failed: {e}");
                self.apply_outcome(item, UpdatePatch::failed(e.to_string()));
                return;
            }
        };

        let req = PublishRequest {
            provider: item.provider.clone(),
            author: item.author.clone(),
            content,
            parent_id,
        };

        match self.publisher.publish(&req).await {
            Ok(external_id) => {
                info!(item_uuid = %item.uuid, kind = %item.kind, external_id = %external_id, "item published");
                self.apply_outcome(item, UpdatePatch::published(external_id));
            }
            Err(e) => {
                error!(item_uuid = %item.uuid, kind = %item.kind, "publish failed: {e}");
                self.apply_outcome(item, UpdatePatch::failed(e.to_string()));
                if item.kind == ItemKind::Post {
                    self.warn_dependents(&item.uuid);
                }
            }
        }
    }

    /// Record a publish outcome; a write failure here is logged and skipped
    /// so the rest of the tick still runs.
    fn apply_outcome(&self, item: &QueueItem, patch: UpdatePatch) {
        if let Err(e) = self.store.update(&item.uuid, patch) {
            error!(item_uuid = %item.uuid, "failed to record outcome: {e}");
        }
    }

    /// A failed post takes its comments down with it on their next
    /// evaluation; surface that now so the operator isn't surprised later.
    fn warn_dependents(&self, parent_uuid: &str) {
        match self.store.list_comments_for(parent_uuid) {
            Ok(comments) if !comments.is_empty() => {
                warn!(
                    parent_uuid,
                    count = comments.len(),
                    "dependent comments will be blocked"
                );
            }
            Ok(_) => {}
            Err(e) => error!(parent_uuid, "dependent comment lookup failed: {e}"),
        }
    }
}

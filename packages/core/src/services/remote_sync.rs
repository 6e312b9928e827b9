//! Remote sync driver
//!
//! Pulls change batches from a [`RemoteSource`] and merges them into the
//! shared document, and pushes the document's locally dirty nodes back.
//! Fetches run without holding the document lock; the merge itself happens
//! in one critical section so commands never observe a half-applied batch.

use crate::document::SharedDocument;
use crate::error::OutlineResult;
use crate::services::{MergeReport, RemoteChange};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;

/// External store the outline is synchronized with
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Changes made elsewhere since the last fetch
    async fn fetch(&self) -> OutlineResult<Vec<RemoteChange>>;

    /// Publish local changes
    async fn push(&self, changes: Vec<RemoteChange>) -> OutlineResult<()>;
}

pub struct RemoteSync {
    document: SharedDocument,
    source: Arc<dyn RemoteSource>,
    cancel: Notify,
}

impl RemoteSync {
    pub fn new(document: SharedDocument, source: Arc<dyn RemoteSource>) -> Self {
        Self {
            document,
            source,
            cancel: Notify::new(),
        }
    }

    /// Fetch and merge one batch
    ///
    /// Returns `Ok(None)` when [`RemoteSync::cancel`] interrupted the fetch;
    /// nothing is applied in that case.
    pub async fn pull(&self) -> OutlineResult<Option<MergeReport>> {
        let changes = tokio::select! {
            _ = self.cancel.notified() => {
                tracing::debug!("Remote pull cancelled");
                return Ok(None);
            }
            changes = self.source.fetch() => changes?,
        };
        if changes.is_empty() {
            return Ok(Some(MergeReport::default()));
        }

        let report = self.document.lock().apply_remote_batch(changes);
        Ok(Some(report))
    }

    /// Send pending local changes; they are requeued if the push fails
    pub async fn push(&self) -> OutlineResult<usize> {
        let changes = self.document.lock().take_outbound_changes();
        if changes.is_empty() {
            return Ok(0);
        }
        let count = changes.len();
        if let Err(e) = self.source.push(changes.clone()).await {
            tracing::warn!("Remote push of {} change(s) failed: {}", count, e);
            self.document.lock().requeue_outbound(changes);
            return Err(e);
        }
        tracing::info!("Pushed {} change(s)", count);
        Ok(count)
    }

    /// Abandon any in-flight pull
    pub fn cancel(&self) {
        self.cancel.notify_waiters();
    }
}

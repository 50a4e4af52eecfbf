//! Fire-and-forget audit trail for resolutions.
//!
//! Resolvers hand records to a bounded queue and move on. A background task
//! drains the queue into the [`ResolutionLogRepository`]. A full or closed
//! queue drops the record with a warning; persistence failures are logged and
//! never reach the resolver.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::domain::models::ResolutionRecord;
use crate::domain::ports::ResolutionLogRepository;

/// Sending side of the audit queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResolutionAuditHandle {
    sender: mpsc::Sender<ResolutionRecord>,
}

impl ResolutionAuditHandle {
    /// Enqueue without waiting. Returns whether the record was accepted.
    pub fn offer(&self, record: ResolutionRecord) -> bool {
        match self.sender.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                tracing::warn!(
                    workspace_id = %record.workspace_id,
                    metric_id = %record.metric_id,
                    "resolution audit queue full, record dropped"
                );
                false
            }
            Err(TrySendError::Closed(record)) => {
                tracing::warn!(
                    workspace_id = %record.workspace_id,
                    metric_id = %record.metric_id,
                    "resolution audit worker stopped, record dropped"
                );
                false
            }
        }
    }
}

pub struct ResolutionAudit;

impl ResolutionAudit {
    /// Start the background writer. The worker exits once every handle is
    /// dropped and the queue is drained; its join value is the number of
    /// records persisted.
    pub fn spawn<R>(repository: Arc<R>, capacity: usize) -> (ResolutionAuditHandle, JoinHandle<u64>)
    where
        R: ResolutionLogRepository + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<ResolutionRecord>(capacity.max(1));

        let worker = tokio::spawn(async move {
            let mut persisted = 0u64;
            while let Some(record) = receiver.recv().await {
                match repository.record(&record).await {
                    Ok(()) => persisted += 1,
                    Err(e) => tracing::warn!(
                        error = %e,
                        record_id = %record.record_id,
                        "failed to persist resolution record"
                    ),
                }
            }
            tracing::debug!(persisted, "resolution audit worker finished");
            persisted
        });

        (ResolutionAuditHandle { sender }, worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteResolutionLogRepository};
    use crate::domain::models::{utc_now, Context};
    use uuid::Uuid;

    fn record(metric_id: &str) -> ResolutionRecord {
        ResolutionRecord {
            record_id: Uuid::new_v4(),
            workspace_id: "default".to_string(),
            metric_id: metric_id.to_string(),
            context: Context::new(),
            base_version_id: 1,
            applied_overlay_ids: Vec::new(),
            resolved_at: utc_now(),
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue_after_handles_drop() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteResolutionLogRepository::new(pool));
        let (handle, worker) = ResolutionAudit::spawn(repo.clone(), 16);

        assert!(handle.offer(record("revenue")));
        assert!(handle.clone().offer(record("churn")));
        drop(handle);

        assert_eq!(worker.await.unwrap(), 2);
        assert_eq!(repo.list_recent("default", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_offer_to_stopped_worker_is_dropped() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteResolutionLogRepository::new(pool));
        let (handle, worker) = ResolutionAudit::spawn(repo, 4);
        worker.abort();
        let _ = worker.await;

        assert!(!handle.offer(record("revenue")));
    }
}

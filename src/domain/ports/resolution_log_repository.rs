//! Resolution audit trail port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ResolutionRecord;

#[async_trait]
pub trait ResolutionLogRepository: Send + Sync {
    async fn record(&self, record: &ResolutionRecord) -> DomainResult<()>;

    /// Most recent records in a workspace, newest first.
    async fn list_recent(&self, workspace_id: &str, limit: u32) -> DomainResult<Vec<ResolutionRecord>>;
}

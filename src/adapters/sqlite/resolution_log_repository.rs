//! SQLite implementation of the ResolutionLogRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_json_object, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ResolutionRecord;
use crate::domain::ports::ResolutionLogRepository;

#[derive(Clone)]
pub struct SqliteResolutionLogRepository {
    pool: SqlitePool,
}

impl SqliteResolutionLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResolutionLogRepository for SqliteResolutionLogRepository {
    async fn record(&self, record: &ResolutionRecord) -> DomainResult<()> {
        let context_json = serde_json::to_string(&record.context)?;
        let applied_json = serde_json::to_string(&record.applied_overlay_ids)?;

        sqlx::query(
            r#"INSERT INTO resolution_log (record_id, workspace_id, metric_id, context, base_version_id, applied_overlay_ids, resolved_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.record_id.to_string())
        .bind(&record.workspace_id)
        .bind(&record.metric_id)
        .bind(&context_json)
        .bind(record.base_version_id)
        .bind(&applied_json)
        .bind(format_datetime(&record.resolved_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(&self, workspace_id: &str, limit: u32) -> DomainResult<Vec<ResolutionRecord>> {
        let rows: Vec<ResolutionRow> = sqlx::query_as(
            "SELECT record_id, workspace_id, metric_id, context, base_version_id, applied_overlay_ids, resolved_at
             FROM resolution_log WHERE workspace_id = ?
             ORDER BY resolved_at DESC LIMIT ?",
        )
        .bind(workspace_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ResolutionRow {
    record_id: String,
    workspace_id: String,
    metric_id: String,
    context: String,
    base_version_id: i64,
    applied_overlay_ids: String,
    resolved_at: String,
}

impl TryFrom<ResolutionRow> for ResolutionRecord {
    type Error = DomainError;

    fn try_from(row: ResolutionRow) -> Result<Self, Self::Error> {
        let applied_overlay_ids: Vec<Uuid> = serde_json::from_str(&row.applied_overlay_ids)?;

        Ok(ResolutionRecord {
            record_id: parse_uuid(&row.record_id)?,
            workspace_id: row.workspace_id,
            metric_id: row.metric_id,
            context: parse_json_object(&row.context)?,
            base_version_id: row.base_version_id,
            applied_overlay_ids,
            resolved_at: parse_datetime(&row.resolved_at)?,
        })
    }
}

//! SQLite implementation of the SemanticEventRepository.
//!
//! Appends run in one transaction: the event insert is guarded by the
//! `(workspace_id, metric_id, version_id)` unique key, and the latest pointer
//! is moved with a compare-and-set upsert that only succeeds when the pointer
//! still sits at the previous version. A missing pointer may only be created
//! at version 1.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{
    format_datetime, is_foreign_key_violation, is_unique_violation, parse_datetime, parse_json, parse_uuid,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MetricLatest, SemanticEvent};
use crate::domain::ports::SemanticEventRepository;

const EVENT_COLUMNS: &str = "event_id, workspace_id, metric_id, version_id, event_type, timestamp, \
                             source_system, source_ref, reason, actor, snapshot";

#[derive(Clone)]
pub struct SqliteSemanticEventRepository {
    pool: SqlitePool,
}

impl SqliteSemanticEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn conflict(event: &SemanticEvent) -> DomainError {
        DomainError::ConcurrencyConflict {
            entity: "metric".to_string(),
            id: format!("{}/{}", event.workspace_id, event.metric_id),
        }
    }
}

#[async_trait]
impl SemanticEventRepository for SqliteSemanticEventRepository {
    async fn append(&self, event: &SemanticEvent) -> DomainResult<()> {
        let source_ref_json = serde_json::to_string(&event.source_ref)?;
        let snapshot_json = serde_json::to_string(&event.snapshot)?;
        let timestamp = format_datetime(&event.timestamp);

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO semantic_events ({EVENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(event.event_id.to_string())
        .bind(&event.workspace_id)
        .bind(&event.metric_id)
        .bind(event.version_id)
        .bind(&event.event_type)
        .bind(&timestamp)
        .bind(&event.source_system)
        .bind(&source_ref_json)
        .bind(&event.reason)
        .bind(&event.actor)
        .bind(&snapshot_json)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Err(Self::conflict(event));
            }
            Err(e) if is_foreign_key_violation(&e) => {
                tx.rollback().await?;
                return Err(DomainError::unknown_metric(&event.workspace_id, &event.metric_id));
            }
            Err(e) => return Err(e.into()),
        }

        let moved = sqlx::query(
            r#"INSERT INTO metric_latest (workspace_id, metric_id, latest_version_id, latest_event_id, updated_at)
               SELECT ?1, ?2, ?3, ?4, ?5
               WHERE ?3 = 1 OR EXISTS (
                   SELECT 1 FROM metric_latest WHERE workspace_id = ?1 AND metric_id = ?2
               )
               ON CONFLICT(workspace_id, metric_id) DO UPDATE SET
                   latest_version_id = excluded.latest_version_id,
                   latest_event_id = excluded.latest_event_id,
                   updated_at = excluded.updated_at
               WHERE metric_latest.latest_version_id = excluded.latest_version_id - 1"#,
        )
        .bind(&event.workspace_id)
        .bind(&event.metric_id)
        .bind(event.version_id)
        .bind(event.event_id.to_string())
        .bind(&timestamp)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(Self::conflict(event));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn latest(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Option<MetricLatest>> {
        let row: Option<MetricLatestRow> = sqlx::query_as(
            "SELECT workspace_id, metric_id, latest_version_id, latest_event_id, updated_at
             FROM metric_latest WHERE workspace_id = ? AND metric_id = ?",
        )
        .bind(workspace_id)
        .bind(metric_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn history(&self, workspace_id: &str, metric_id: &str, limit: u32) -> DomainResult<Vec<SemanticEvent>> {
        let rows: Vec<SemanticEventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM semantic_events
             WHERE workspace_id = ? AND metric_id = ?
             ORDER BY version_id DESC LIMIT ?"
        ))
        .bind(workspace_id)
        .bind(metric_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get(&self, workspace_id: &str, event_id: Uuid) -> DomainResult<Option<SemanticEvent>> {
        let row: Option<SemanticEventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM semantic_events WHERE workspace_id = ? AND event_id = ?"
        ))
        .bind(workspace_id)
        .bind(event_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct SemanticEventRow {
    event_id: String,
    workspace_id: String,
    metric_id: String,
    version_id: i64,
    event_type: String,
    timestamp: String,
    source_system: String,
    source_ref: String,
    reason: Option<String>,
    actor: Option<String>,
    snapshot: String,
}

impl TryFrom<SemanticEventRow> for SemanticEvent {
    type Error = DomainError;

    fn try_from(row: SemanticEventRow) -> Result<Self, Self::Error> {
        Ok(SemanticEvent {
            event_id: parse_uuid(&row.event_id)?,
            workspace_id: row.workspace_id,
            metric_id: row.metric_id,
            version_id: row.version_id,
            event_type: row.event_type,
            timestamp: parse_datetime(&row.timestamp)?,
            source_system: row.source_system,
            source_ref: parse_json(&row.source_ref)?,
            reason: row.reason,
            actor: row.actor,
            snapshot: parse_json(&row.snapshot)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MetricLatestRow {
    workspace_id: String,
    metric_id: String,
    latest_version_id: i64,
    latest_event_id: String,
    updated_at: String,
}

impl TryFrom<MetricLatestRow> for MetricLatest {
    type Error = DomainError;

    fn try_from(row: MetricLatestRow) -> Result<Self, Self::Error> {
        Ok(MetricLatest {
            workspace_id: row.workspace_id,
            metric_id: row.metric_id,
            latest_version_id: row.latest_version_id,
            latest_event_id: parse_uuid(&row.latest_event_id)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

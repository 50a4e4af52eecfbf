//! SQLite implementation of the OverlayRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{
    format_datetime, is_foreign_key_violation, parse_datetime, parse_json, parse_json_object,
    parse_optional_datetime, parse_uuid,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Overlay;
use crate::domain::ports::OverlayRepository;

const OVERLAY_COLUMNS: &str = "overlay_id, workspace_id, metric_id, selector, priority, overlay_patch, \
                               valid_from, valid_to, author, reason, created_at";

#[derive(Clone)]
pub struct SqliteOverlayRepository {
    pool: SqlitePool,
}

impl SqliteOverlayRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OverlayRepository for SqliteOverlayRepository {
    async fn create(&self, overlay: &Overlay) -> DomainResult<()> {
        let selector_json = serde_json::to_string(&overlay.selector)?;
        let patch_json = serde_json::to_string(&overlay.overlay_patch)?;

        let result = sqlx::query(&format!(
            "INSERT INTO overlays ({OVERLAY_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(overlay.overlay_id.to_string())
        .bind(&overlay.workspace_id)
        .bind(&overlay.metric_id)
        .bind(&selector_json)
        .bind(overlay.priority)
        .bind(&patch_json)
        .bind(overlay.valid_from.as_ref().map(format_datetime))
        .bind(overlay.valid_to.as_ref().map(format_datetime))
        .bind(&overlay.author)
        .bind(&overlay.reason)
        .bind(format_datetime(&overlay.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(DomainError::unknown_metric(&overlay.workspace_id, &overlay.metric_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Vec<Overlay>> {
        let rows: Vec<OverlayRow> = sqlx::query_as(&format!(
            "SELECT {OVERLAY_COLUMNS} FROM overlays
             WHERE workspace_id = ? AND metric_id = ?
             ORDER BY priority DESC, created_at DESC"
        ))
        .bind(workspace_id)
        .bind(metric_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get(&self, workspace_id: &str, overlay_id: Uuid) -> DomainResult<Option<Overlay>> {
        let row: Option<OverlayRow> = sqlx::query_as(&format!(
            "SELECT {OVERLAY_COLUMNS} FROM overlays WHERE workspace_id = ? AND overlay_id = ?"
        ))
        .bind(workspace_id)
        .bind(overlay_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct OverlayRow {
    overlay_id: String,
    workspace_id: String,
    metric_id: String,
    selector: String,
    priority: i32,
    overlay_patch: String,
    valid_from: Option<String>,
    valid_to: Option<String>,
    author: Option<String>,
    reason: Option<String>,
    created_at: String,
}

impl TryFrom<OverlayRow> for Overlay {
    type Error = DomainError;

    fn try_from(row: OverlayRow) -> Result<Self, Self::Error> {
        Ok(Overlay {
            overlay_id: parse_uuid(&row.overlay_id)?,
            workspace_id: row.workspace_id,
            metric_id: row.metric_id,
            selector: parse_json_object(&row.selector)?,
            priority: row.priority,
            overlay_patch: parse_json(&row.overlay_patch)?,
            valid_from: parse_optional_datetime(row.valid_from)?,
            valid_to: parse_optional_datetime(row.valid_to)?,
            author: row.author,
            reason: row.reason,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

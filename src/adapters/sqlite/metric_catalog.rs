//! SQLite implementation of the MetricCatalog.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{
    format_datetime, is_foreign_key_violation, is_unique_violation, parse_datetime, parse_uuid,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    utc_now, Metric, MetricAlias, MetricStatus, NewMetricAlias, DEFAULT_ALIAS_CONFIDENCE,
};
use crate::domain::ports::MetricCatalog;

const ALIAS_COLUMNS: &str = "alias_id, workspace_id, metric_id, source_system, source_locator, alias_name, \
                             confidence, first_seen_at, last_seen_at";

#[derive(Clone)]
pub struct SqliteMetricCatalog {
    pool: SqlitePool,
}

impl SqliteMetricCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricCatalog for SqliteMetricCatalog {
    async fn create(&self, metric: &Metric) -> DomainResult<()> {
        let result = sqlx::query(
            r#"INSERT INTO metrics (workspace_id, metric_id, canonical_name, description, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&metric.workspace_id)
        .bind(&metric.metric_id)
        .bind(&metric.canonical_name)
        .bind(&metric.description)
        .bind(metric.status.as_str())
        .bind(format_datetime(&metric.created_at))
        .bind(format_datetime(&metric.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::ValidationFailed(format!(
                "metric {}/{} is already registered",
                metric.workspace_id, metric.metric_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Option<Metric>> {
        let row: Option<MetricRow> = sqlx::query_as(
            "SELECT workspace_id, metric_id, canonical_name, description, status, created_at, updated_at
             FROM metrics WHERE workspace_id = ? AND metric_id = ?",
        )
        .bind(workspace_id)
        .bind(metric_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn exists(&self, workspace_id: &str, metric_id: &str) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM metrics WHERE workspace_id = ? AND metric_id = ?")
            .bind(workspace_id)
            .bind(metric_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn upsert_alias(
        &self,
        workspace_id: &str,
        metric_id: &str,
        alias: &NewMetricAlias,
    ) -> DomainResult<MetricAlias> {
        let now = format_datetime(&utc_now());
        let mut tx = self.pool.begin().await?;

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT alias_id FROM metric_aliases
             WHERE workspace_id = ? AND source_system = ? AND source_locator = ?",
        )
        .bind(workspace_id)
        .bind(&alias.source_system)
        .bind(&alias.source_locator)
        .fetch_optional(&mut *tx)
        .await?;

        let written = match &existing {
            // An omitted confidence keeps the stored one.
            Some((alias_id,)) => {
                sqlx::query(
                    r#"UPDATE metric_aliases
                       SET metric_id = ?, alias_name = ?, confidence = COALESCE(?, confidence), last_seen_at = ?
                       WHERE alias_id = ?"#,
                )
                .bind(metric_id)
                .bind(&alias.alias_name)
                .bind(alias.confidence)
                .bind(&now)
                .bind(alias_id)
                .execute(&mut *tx)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO metric_aliases ({ALIAS_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(Uuid::new_v4().to_string())
                .bind(workspace_id)
                .bind(metric_id)
                .bind(&alias.source_system)
                .bind(&alias.source_locator)
                .bind(&alias.alias_name)
                .bind(alias.confidence.unwrap_or(DEFAULT_ALIAS_CONFIDENCE))
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await
            }
        };

        match written {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => {
                tx.rollback().await?;
                return Err(DomainError::metric_not_found(workspace_id, metric_id));
            }
            Err(e) => return Err(e.into()),
        }

        let row: AliasRow = sqlx::query_as(&format!(
            "SELECT {ALIAS_COLUMNS} FROM metric_aliases
             WHERE workspace_id = ? AND source_system = ? AND source_locator = ?"
        ))
        .bind(workspace_id)
        .bind(&alias.source_system)
        .bind(&alias.source_locator)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn list_aliases(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Vec<MetricAlias>> {
        let rows: Vec<AliasRow> = sqlx::query_as(&format!(
            "SELECT {ALIAS_COLUMNS} FROM metric_aliases
             WHERE workspace_id = ? AND metric_id = ?
             ORDER BY source_system, source_locator"
        ))
        .bind(workspace_id)
        .bind(metric_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct MetricRow {
    workspace_id: String,
    metric_id: String,
    canonical_name: String,
    description: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<MetricRow> for Metric {
    type Error = DomainError;

    fn try_from(row: MetricRow) -> Result<Self, Self::Error> {
        let status = MetricStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid metric status: {}", row.status)))?;

        Ok(Metric {
            workspace_id: row.workspace_id,
            metric_id: row.metric_id,
            canonical_name: row.canonical_name,
            description: row.description,
            status,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AliasRow {
    alias_id: String,
    workspace_id: String,
    metric_id: String,
    source_system: String,
    source_locator: String,
    alias_name: String,
    confidence: f64,
    first_seen_at: String,
    last_seen_at: String,
}

impl TryFrom<AliasRow> for MetricAlias {
    type Error = DomainError;

    fn try_from(row: AliasRow) -> Result<Self, Self::Error> {
        Ok(MetricAlias {
            alias_id: parse_uuid(&row.alias_id)?,
            workspace_id: row.workspace_id,
            metric_id: row.metric_id,
            source_system: row.source_system,
            source_locator: row.source_locator,
            alias_name: row.alias_name,
            confidence: row.confidence,
            first_seen_at: parse_datetime(&row.first_seen_at)?,
            last_seen_at: parse_datetime(&row.last_seen_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteMetricCatalog {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteMetricCatalog::new(pool)
    }

    fn alias(locator: &str, confidence: Option<f64>) -> NewMetricAlias {
        NewMetricAlias {
            source_system: "dbt".to_string(),
            source_locator: locator.to_string(),
            alias_name: "total revenue".to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_metric() {
        let repo = setup_test_repo().await;
        let metric = Metric::new("default", "revenue", "Revenue").with_description("Gross revenue");
        repo.create(&metric).await.unwrap();

        let loaded = repo.get("default", "revenue").await.unwrap().unwrap();
        assert_eq!(loaded, metric);
        assert!(repo.exists("default", "revenue").await.unwrap());
        assert!(!repo.exists("other", "revenue").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_metric_is_rejected() {
        let repo = setup_test_repo().await;
        let metric = Metric::new("default", "revenue", "Revenue");
        repo.create(&metric).await.unwrap();

        let err = repo.create(&metric).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_same_metric_id_in_two_workspaces() {
        let repo = setup_test_repo().await;
        repo.create(&Metric::new("ws1", "revenue", "Revenue")).await.unwrap();
        repo.create(&Metric::new("ws2", "revenue", "Revenue (EU)")).await.unwrap();

        assert_eq!(repo.get("ws2", "revenue").await.unwrap().unwrap().canonical_name, "Revenue (EU)");
    }

    #[tokio::test]
    async fn test_upsert_alias_inserts_then_repoints() {
        let repo = setup_test_repo().await;
        repo.create(&Metric::new("default", "revenue", "Revenue")).await.unwrap();
        repo.create(&Metric::new("default", "net_revenue", "Net revenue")).await.unwrap();

        let first = repo.upsert_alias("default", "revenue", &alias("models/rev.yml", None)).await.unwrap();
        assert_eq!(first.confidence, DEFAULT_ALIAS_CONFIDENCE);

        let moved = repo
            .upsert_alias("default", "net_revenue", &alias("models/rev.yml", Some(0.9)))
            .await
            .unwrap();
        assert_eq!(moved.alias_id, first.alias_id);
        assert_eq!(moved.metric_id, "net_revenue");
        assert_eq!(moved.confidence, 0.9);

        // omitted confidence keeps the stored value
        let again = repo
            .upsert_alias("default", "net_revenue", &alias("models/rev.yml", None))
            .await
            .unwrap();
        assert_eq!(again.confidence, 0.9);

        assert!(repo.list_aliases("default", "revenue").await.unwrap().is_empty());
        assert_eq!(repo.list_aliases("default", "net_revenue").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_alias_for_unknown_metric_fails() {
        let repo = setup_test_repo().await;
        let err = repo.upsert_alias("default", "missing", &alias("x", None)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

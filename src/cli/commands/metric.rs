//! Metric catalog CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::cli::session::Session;
use crate::domain::models::{Metric, MetricAlias, MetricSummary, NewMetricAlias};
use crate::services::MetricService;

#[derive(Args, Debug)]
pub struct MetricArgs {
    #[command(subcommand)]
    pub command: MetricCommands,
}

#[derive(Subcommand, Debug)]
pub enum MetricCommands {
    /// Register a metric identity
    Register {
        /// Metric id, unique within the workspace
        metric_id: String,
        /// Human-readable canonical name
        #[arg(short, long)]
        name: String,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show a metric and its latest version
    Show {
        /// Metric id
        metric_id: String,
    },
    /// Record where a metric appears in another system
    Alias {
        /// Metric id
        metric_id: String,
        /// Source system (dbt, looker, ...)
        #[arg(short, long)]
        source_system: String,
        /// Location of the metric inside the source system
        #[arg(short, long)]
        locator: String,
        /// Name the source system uses
        #[arg(short, long)]
        name: String,
        /// Match confidence between 0 and 1; kept unchanged on update when omitted
        #[arg(short, long)]
        confidence: Option<f64>,
    },
    /// List a metric's aliases
    Aliases {
        /// Metric id
        metric_id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct MetricOutput {
    pub workspace_id: String,
    pub metric_id: String,
    pub canonical_name: String,
    pub description: Option<String>,
    pub status: String,
    pub latest_version_id: Option<i64>,
    pub latest_event_id: Option<String>,
    pub created_at: String,
}

impl From<&MetricSummary> for MetricOutput {
    fn from(summary: &MetricSummary) -> Self {
        let metric = &summary.metric;
        Self {
            workspace_id: metric.workspace_id.clone(),
            metric_id: metric.metric_id.clone(),
            canonical_name: metric.canonical_name.clone(),
            description: metric.description.clone(),
            status: metric.status.as_str().to_string(),
            latest_version_id: summary.latest.as_ref().map(|l| l.latest_version_id),
            latest_event_id: summary.latest.as_ref().map(|l| l.latest_event_id.to_string()),
            created_at: metric.created_at.to_rfc3339(),
        }
    }
}

impl From<&Metric> for MetricOutput {
    fn from(metric: &Metric) -> Self {
        Self::from(&MetricSummary {
            metric: metric.clone(),
            latest: None,
        })
    }
}

impl CommandOutput for MetricOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Metric: {}/{}", self.workspace_id, self.metric_id),
            format!("Name: {}", self.canonical_name),
            format!("Status: {}", self.status),
        ];
        if let Some(ref description) = self.description {
            lines.push(format!("Description: {description}"));
        }
        match (self.latest_version_id, &self.latest_event_id) {
            (Some(version), Some(event_id)) => lines.push(format!("Latest: v{version} ({event_id})")),
            _ => lines.push("Latest: no events yet".to_string()),
        }
        lines.push(format!("Created: {}", self.created_at));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct MetricActionOutput {
    pub success: bool,
    pub message: String,
    pub metric: MetricOutput,
}

impl CommandOutput for MetricActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AliasListOutput {
    pub metric_id: String,
    pub aliases: Vec<MetricAlias>,
    pub total: usize,
}

impl CommandOutput for AliasListOutput {
    fn to_human(&self) -> String {
        if self.aliases.is_empty() {
            return format!("No aliases recorded for {}.", self.metric_id);
        }
        format!(
            "{} alias(es) for {}:\n{}",
            self.total,
            self.metric_id,
            TableFormatter::new().format_aliases(&self.aliases)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AliasOutput {
    pub success: bool,
    pub alias: MetricAlias,
}

impl CommandOutput for AliasOutput {
    fn to_human(&self) -> String {
        format!(
            "Alias {}:{} -> {} (confidence {:.2})",
            self.alias.source_system, self.alias.source_locator, self.alias.metric_id, self.alias.confidence
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: MetricArgs, session: &Session, json_mode: bool) -> Result<()> {
    let service = MetricService::new(session.catalog(), session.events());
    let ws = session.workspace_id.as_str();

    match args.command {
        MetricCommands::Register { metric_id, name, description } => {
            let metric = service.register(ws, &metric_id, &name, description).await?;
            let out = MetricActionOutput {
                success: true,
                message: format!("Metric registered: {}/{}", metric.workspace_id, metric.metric_id),
                metric: MetricOutput::from(&metric),
            };
            output(&out, json_mode);
        }

        MetricCommands::Show { metric_id } => {
            let summary = service.summary(ws, &metric_id).await?;
            output(&MetricOutput::from(&summary), json_mode);
        }

        MetricCommands::Alias {
            metric_id,
            source_system,
            locator,
            name,
            confidence,
        } => {
            let alias = service
                .upsert_alias(
                    ws,
                    &metric_id,
                    NewMetricAlias {
                        source_system,
                        source_locator: locator,
                        alias_name: name,
                        confidence,
                    },
                )
                .await?;
            output(&AliasOutput { success: true, alias }, json_mode);
        }

        MetricCommands::Aliases { metric_id } => {
            let aliases = service.list_aliases(ws, &metric_id).await?;
            let out = AliasListOutput {
                metric_id,
                total: aliases.len(),
                aliases,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

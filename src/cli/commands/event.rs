//! Semantic event CLI commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::cli::input::{json_from_inline_or_file, parse_json};
use crate::cli::output::{output, pretty_json, CommandOutput, TableFormatter};
use crate::cli::session::Session;
use crate::domain::models::{MetricLatest, NewSemanticEvent, SemanticEvent};
use crate::services::EventLogService;

#[derive(Args, Debug)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommands,
}

#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Append the next version of a metric definition
    Append {
        /// Metric id
        metric_id: String,
        /// Event type (snapshot, edit, import, ...)
        #[arg(short = 't', long = "type", default_value = "snapshot")]
        event_type: String,
        /// System the definition came from
        #[arg(short, long, default_value = "cli")]
        source_system: String,
        /// Reference inside the source system, as a JSON value
        #[arg(long)]
        source_ref: Option<String>,
        /// Full definition snapshot as inline JSON
        #[arg(long, conflicts_with = "snapshot_file")]
        snapshot: Option<String>,
        /// Read the snapshot from a JSON file
        #[arg(long)]
        snapshot_file: Option<PathBuf>,
        /// Why the definition changed
        #[arg(short, long)]
        reason: Option<String>,
        /// Who made the change
        #[arg(short, long)]
        actor: Option<String>,
    },
    /// Show version history, newest first
    History {
        /// Metric id
        metric_id: String,
        /// Maximum number of events to display
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show a single event with its snapshot
    Show {
        /// Event ID
        event_id: Uuid,
    },
    /// Show the latest version pointer
    Latest {
        /// Metric id
        metric_id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct EventOutput {
    #[serde(flatten)]
    pub event: SemanticEvent,
}

impl CommandOutput for EventOutput {
    fn to_human(&self) -> String {
        let event = &self.event;
        let mut lines = vec![
            format!("Event: {}", event.event_id),
            format!("Metric: {}/{} v{}", event.workspace_id, event.metric_id, event.version_id),
            format!("Type: {}", event.event_type),
            format!("Source: {} {}", event.source_system, event.source_ref),
            format!("Timestamp: {}", event.timestamp.to_rfc3339()),
        ];
        if let Some(ref actor) = event.actor {
            lines.push(format!("Actor: {actor}"));
        }
        if let Some(ref reason) = event.reason {
            lines.push(format!("Reason: {reason}"));
        }
        lines.push(format!("Snapshot:\n{}", pretty_json(&event.snapshot)));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AppendOutput {
    pub success: bool,
    pub event_id: String,
    pub metric_id: String,
    pub version_id: i64,
}

impl CommandOutput for AppendOutput {
    fn to_human(&self) -> String {
        format!("Appended {} v{} (event {})", self.metric_id, self.version_id, self.event_id)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub metric_id: String,
    pub events: Vec<SemanticEvent>,
    pub total: usize,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.events.is_empty() {
            return format!("No events recorded for {}.", self.metric_id);
        }
        format!(
            "{} event(s) for {}:\n{}",
            self.total,
            self.metric_id,
            TableFormatter::new().format_events(&self.events)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LatestOutput {
    pub metric_id: String,
    pub latest: Option<MetricLatest>,
}

impl CommandOutput for LatestOutput {
    fn to_human(&self) -> String {
        match self.latest {
            Some(ref latest) => format!(
                "{} is at v{} (event {}, updated {})",
                self.metric_id,
                latest.latest_version_id,
                latest.latest_event_id,
                latest.updated_at.to_rfc3339()
            ),
            None => format!("{} has no events yet.", self.metric_id),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: EventArgs, session: &Session, json_mode: bool) -> Result<()> {
    let service = EventLogService::new(session.events(), session.catalog());
    let ws = session.workspace_id.as_str();

    match args.command {
        EventCommands::Append {
            metric_id,
            event_type,
            source_system,
            source_ref,
            snapshot,
            snapshot_file,
            reason,
            actor,
        } => {
            let snapshot = json_from_inline_or_file(snapshot.as_deref(), snapshot_file.as_deref(), "snapshot")?;
            let mut input = NewSemanticEvent::new(event_type, source_system, snapshot);
            if let Some(ref text) = source_ref {
                input = input.with_source_ref(parse_json(text, "source-ref")?);
            }
            input.reason = reason;
            input.actor = actor;

            let event = service.append(ws, &metric_id, input).await?;
            let out = AppendOutput {
                success: true,
                event_id: event.event_id.to_string(),
                metric_id: event.metric_id,
                version_id: event.version_id,
            };
            output(&out, json_mode);
        }

        EventCommands::History { metric_id, limit } => {
            let settings = &session.config.resolution;
            let limit = limit.unwrap_or(settings.history_default_limit);
            if limit > settings.history_max_limit {
                bail!("--limit {limit} exceeds the configured maximum of {}", settings.history_max_limit);
            }
            let events = service.get_history(ws, &metric_id, limit).await?;
            let out = HistoryOutput {
                metric_id,
                total: events.len(),
                events,
            };
            output(&out, json_mode);
        }

        EventCommands::Show { event_id } => {
            let event = service.require_event(ws, event_id).await?;
            output(&EventOutput { event }, json_mode);
        }

        EventCommands::Latest { metric_id } => {
            let latest = service.get_latest(ws, &metric_id).await?;
            output(&LatestOutput { metric_id, latest }, json_mode);
        }
    }

    Ok(())
}

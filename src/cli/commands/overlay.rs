//! Overlay CLI commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::cli::input::{json_from_inline_or_file, parse_json_object, parse_timestamp};
use crate::cli::output::{output, pretty_json, CommandOutput, TableFormatter};
use crate::cli::session::Session;
use crate::domain::models::{utc_now, NewOverlay, Overlay};
use crate::services::OverlayService;

#[derive(Args, Debug)]
pub struct OverlayArgs {
    #[command(subcommand)]
    pub command: OverlayCommands,
}

#[derive(Subcommand, Debug)]
pub enum OverlayCommands {
    /// Create a context-conditional patch for a metric
    Create {
        /// Metric id
        metric_id: String,
        /// Context keys that must all match, as a JSON object (default matches everything)
        #[arg(long)]
        selector: Option<String>,
        /// Application priority; higher applies later and wins
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        priority: i32,
        /// Patch document as inline JSON
        #[arg(long, conflicts_with = "patch_file")]
        patch: Option<String>,
        /// Read the patch from a JSON file
        #[arg(long)]
        patch_file: Option<PathBuf>,
        /// Start of the validity window (inclusive, RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        valid_from: Option<DateTime<Utc>>,
        /// End of the validity window (exclusive, RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        valid_to: Option<DateTime<Utc>>,
        /// Who wrote the overlay
        #[arg(short, long)]
        author: Option<String>,
        /// Why the overlay exists
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// List every overlay of a metric
    List {
        /// Metric id
        metric_id: String,
    },
    /// Show an overlay with its patch
    Show {
        /// Overlay ID
        overlay_id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct OverlayOutput {
    #[serde(flatten)]
    pub overlay: Overlay,
    pub active: bool,
}

impl CommandOutput for OverlayOutput {
    fn to_human(&self) -> String {
        let overlay = &self.overlay;
        let selector = serde_json::Value::Object(overlay.selector.clone());
        let mut lines = vec![
            format!("Overlay: {}", overlay.overlay_id),
            format!("Metric: {}/{}", overlay.workspace_id, overlay.metric_id),
            format!("Priority: {}", overlay.priority),
            format!("Selector: {selector}"),
            format!("Active: {}", if self.active { "yes" } else { "no" }),
        ];
        if let Some(from) = overlay.valid_from {
            lines.push(format!("Valid from: {}", from.to_rfc3339()));
        }
        if let Some(to) = overlay.valid_to {
            lines.push(format!("Valid to: {}", to.to_rfc3339()));
        }
        if let Some(ref author) = overlay.author {
            lines.push(format!("Author: {author}"));
        }
        if let Some(ref reason) = overlay.reason {
            lines.push(format!("Reason: {reason}"));
        }
        lines.push(format!("Patch:\n{}", pretty_json(&overlay.overlay_patch)));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct OverlayListOutput {
    pub metric_id: String,
    pub overlays: Vec<Overlay>,
    pub total: usize,
    #[serde(skip)]
    pub listed_at: DateTime<Utc>,
}

impl CommandOutput for OverlayListOutput {
    fn to_human(&self) -> String {
        if self.overlays.is_empty() {
            return format!("No overlays for {}.", self.metric_id);
        }
        format!(
            "{} overlay(s) for {}:\n{}",
            self.total,
            self.metric_id,
            TableFormatter::new().format_overlays(&self.overlays, self.listed_at)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: OverlayArgs, session: &Session, json_mode: bool) -> Result<()> {
    let service = OverlayService::new(session.overlays(), session.catalog());
    let ws = session.workspace_id.as_str();

    match args.command {
        OverlayCommands::Create {
            metric_id,
            selector,
            priority,
            patch,
            patch_file,
            valid_from,
            valid_to,
            author,
            reason,
        } => {
            let patch = json_from_inline_or_file(patch.as_deref(), patch_file.as_deref(), "patch")?;
            let mut input = NewOverlay::new(patch).with_priority(priority).with_window(valid_from, valid_to);
            if let Some(ref text) = selector {
                input = input.with_selector(parse_json_object(text, "selector")?);
            }
            input.author = author;
            input.reason = reason;

            let overlay = service.create(ws, &metric_id, input).await?;
            let active = overlay.is_active_at(utc_now());
            output(&OverlayOutput { overlay, active }, json_mode);
        }

        OverlayCommands::List { metric_id } => {
            let overlays = service.list(ws, &metric_id).await?;
            let out = OverlayListOutput {
                metric_id,
                total: overlays.len(),
                overlays,
                listed_at: utc_now(),
            };
            output(&out, json_mode);
        }

        OverlayCommands::Show { overlay_id } => {
            let overlay = service.require(ws, overlay_id).await?;
            let active = overlay.is_active_at(utc_now());
            output(&OverlayOutput { overlay, active }, json_mode);
        }
    }

    Ok(())
}

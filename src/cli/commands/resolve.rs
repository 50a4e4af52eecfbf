//! Implementation of the `engram resolve` command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use crate::cli::input::{build_context, parse_timestamp};
use crate::cli::output::{output, pretty_json, CommandOutput};
use crate::cli::session::{finish_audit, Session};
use crate::domain::models::{Context, ResolvedMetric};
use crate::services::Resolver;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Metric id
    pub metric_id: String,

    /// Request context as a JSON object
    #[arg(short, long)]
    pub context: Option<String>,

    /// Context entries as key=value; values that parse as JSON keep their type
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Evaluate overlay validity windows at this instant instead of now
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, serde::Serialize)]
pub struct ResolveOutput {
    #[serde(flatten)]
    pub resolved: ResolvedMetric,
    pub context: Context,
}

impl CommandOutput for ResolveOutput {
    fn to_human(&self) -> String {
        let resolved = &self.resolved;
        let mut lines = vec![
            format!("Metric: {} (base v{})", resolved.metric_id, resolved.base_version_id),
            format!(
                "Source: {} {} at {}",
                resolved.provenance.source_system,
                resolved.provenance.source_ref,
                resolved.provenance.timestamp.to_rfc3339()
            ),
        ];
        if resolved.applied_overlay_ids.is_empty() {
            lines.push("Overlays: none applied".to_string());
        } else {
            lines.push("Overlays applied, in order:".to_string());
            for id in &resolved.applied_overlay_ids {
                lines.push(format!("  - {id}"));
            }
        }
        lines.push(format!("Definition:\n{}", pretty_json(&resolved.resolved_snapshot)));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ResolveArgs, session: &Session, json_mode: bool) -> Result<()> {
    let context = build_context(args.context.as_deref(), &args.set)?;

    let audit = session.start_audit();
    let (handle, worker) = match audit {
        Some((handle, worker)) => (Some(handle), Some(worker)),
        None => (None, None),
    };

    let mut resolver = Resolver::new(session.events(), session.overlays());
    if let Some(handle) = handle {
        resolver = resolver.with_audit(handle);
    }

    let result = match args.at {
        Some(at) => resolver.resolve_at(&session.workspace_id, &args.metric_id, &context, at).await,
        None => resolver.resolve(&session.workspace_id, &args.metric_id, &context).await,
    };

    // Closing the queue lets the writer drain and exit.
    drop(resolver);
    finish_audit(worker).await;

    let resolved = result?;
    output(&ResolveOutput { resolved, context }, json_mode);
    Ok(())
}

//! Implementation of the `engram seed` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::{inline_json, output, CommandOutput};
use crate::cli::session::{finish_audit, Session};
use crate::services::{Manifest, ManifestLoader, ManifestReport};

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Path to a YAML manifest of metrics, events and overlays
    pub manifest: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct SeedOutput {
    pub success: bool,
    pub manifest: PathBuf,
    #[serde(flatten)]
    pub report: ManifestReport,
}

impl CommandOutput for SeedOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut lines = vec![
            format!("Applied {} to workspace {}", self.manifest.display(), report.workspace_id),
            format!(
                "  metrics:  {} registered, {} already present",
                report.metrics_registered, report.metrics_existing
            ),
            format!("  aliases:  {} upserted", report.aliases_upserted),
            format!("  events:   {} appended, {} skipped", report.events_appended, report.events_skipped),
            format!("  overlays: {} created, {} skipped", report.overlays_created, report.overlays_skipped),
        ];

        if !report.resolutions.is_empty() {
            lines.push("\nSample resolutions:".to_string());
            for sample in &report.resolutions {
                let context = inline_json(&serde_json::Value::Object(sample.context.clone()));
                lines.push(format!(
                    "  {} [{}] context={} -> v{} with {} overlay(s)",
                    sample.metric_id,
                    sample.label,
                    context,
                    sample.resolved.base_version_id,
                    sample.resolved.applied_overlay_ids.len()
                ));
                lines.push(format!("    {}", sample.resolved.resolved_snapshot));
            }
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// `workspace` is the command-line override; it wins over the manifest's own.
pub async fn execute(args: SeedArgs, session: &Session, workspace: Option<&str>, json_mode: bool) -> Result<()> {
    let manifest = Manifest::from_file(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let workspace_id = workspace
        .map(str::to_string)
        .unwrap_or_else(|| manifest.workspace_or(&session.workspace_id).to_string());

    let audit = session.start_audit();
    let (handle, worker) = match audit {
        Some((handle, worker)) => (Some(handle), Some(worker)),
        None => (None, None),
    };

    let mut loader = ManifestLoader::new(session.catalog(), session.events(), session.overlays());
    if let Some(handle) = handle {
        loader = loader.with_audit(handle);
    }

    let result = loader.apply(&manifest, &workspace_id).await;
    drop(loader);
    finish_audit(worker).await;

    let report = result?;
    output(
        &SeedOutput {
            success: true,
            manifest: args.manifest,
            report,
        },
        json_mode,
    );
    Ok(())
}

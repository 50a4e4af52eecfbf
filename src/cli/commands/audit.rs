//! Resolution audit CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::cli::session::Session;
use crate::domain::models::{ResolutionRecord, MAX_HISTORY_LIMIT};
use crate::domain::ports::ResolutionLogRepository;

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Show the most recent resolutions in the workspace
    Recent {
        /// Maximum number of records to display
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct AuditListOutput {
    pub workspace_id: String,
    pub records: Vec<ResolutionRecord>,
    pub total: usize,
}

impl CommandOutput for AuditListOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return format!("No resolutions recorded in {}.", self.workspace_id);
        }
        format!(
            "{} recent resolution(s) in {}:\n{}",
            self.total,
            self.workspace_id,
            TableFormatter::new().format_resolutions(&self.records)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AuditArgs, session: &Session, json_mode: bool) -> Result<()> {
    let log = session.resolution_log();

    match args.command {
        AuditCommands::Recent { limit } => {
            let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
            let records = log.list_recent(&session.workspace_id, limit).await?;
            let out = AuditListOutput {
                workspace_id: session.workspace_id.clone(),
                total: records.len(),
                records,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

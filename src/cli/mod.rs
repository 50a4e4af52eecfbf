//! Command-line interface.
//!
//! Every command except `init` runs against a [`session::Session`] built from
//! the loaded configuration. Results go to stdout, logs to stderr.

pub mod commands;
pub mod input;
pub mod output;
pub mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::domain::models::Config;
use commands::{
    audit::AuditArgs, event::EventArgs, init::InitArgs, metric::MetricArgs, overlay::OverlayArgs,
    resolve::ResolveArgs, seed::SeedArgs,
};
use session::Session;

#[derive(Parser, Debug)]
#[command(name = "engram")]
#[command(about = "Engram - versioned metric definitions with contextual overlays", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Workspace to operate in (defaults to the configured default_workspace)
    #[arg(short, long, global = true, env = "ENGRAM_WORKSPACE")]
    pub workspace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize engram configuration and database
    Init(InitArgs),

    /// Metric identity and alias commands
    Metric(MetricArgs),

    /// Append-only definition history commands
    Event(EventArgs),

    /// Context-conditional patch commands
    Overlay(OverlayArgs),

    /// Resolve a metric's effective definition for a context
    Resolve(ResolveArgs),

    /// Apply a YAML manifest of metrics, events and overlays
    Seed(SeedArgs),

    /// Resolution audit trail commands
    Audit(AuditArgs),
}

/// Run a parsed command with the loaded configuration.
pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let json = cli.json;

    if let Commands::Init(args) = cli.command {
        return commands::init::execute(args, json).await;
    }

    let session = Session::open(config, cli.workspace.clone()).await?;
    let result = match cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Metric(args) => commands::metric::execute(args, &session, json).await,
        Commands::Event(args) => commands::event::execute(args, &session, json).await,
        Commands::Overlay(args) => commands::overlay::execute(args, &session, json).await,
        Commands::Resolve(args) => commands::resolve::execute(args, &session, json).await,
        Commands::Seed(args) => commands::seed::execute(args, &session, cli.workspace.as_deref(), json).await,
        Commands::Audit(args) => commands::audit::execute(args, &session, json).await,
    };

    session.pool.close().await;
    result
}

/// Print a failed command's error and return the process exit code.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> i32 {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve_with_globals() {
        let cli = Cli::try_parse_from([
            "engram", "resolve", "revenue", "--set", "team=marketing", "-w", "acme", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.workspace.as_deref(), Some("acme"));
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.metric_id, "revenue");
                assert_eq!(args.set, vec!["team=marketing".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_overlay_negative_priority() {
        let cli = Cli::try_parse_from([
            "engram", "overlay", "create", "revenue", "--patch", "{}", "--priority", "-5",
        ])
        .unwrap();
        match cli.command {
            Commands::Overlay(args) => match args.command {
                commands::overlay::OverlayCommands::Create { priority, .. } => assert_eq!(priority, -5),
                other => panic!("unexpected overlay command {other:?}"),
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_flags_conflict() {
        let result = Cli::try_parse_from([
            "engram", "event", "append", "revenue", "--snapshot", "{}", "--snapshot-file", "x.json",
        ]);
        assert!(result.is_err());
    }
}

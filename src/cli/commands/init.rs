//! Implementation of the `engram init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

const CONFIG_FILE: &str = "config.yaml";
const DATABASE_FILE: &str = "engram.db";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite config.yaml with defaults even if it exists
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nWrote {CONFIG_DIR}/{CONFIG_FILE}"));
        }
        lines.push(format!("Database ready at {}", self.database_path.display()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("Failed to get current directory")?.join(&args.path)
    };

    let engram_dir = target_path.join(CONFIG_DIR);
    let already_initialized = engram_dir.join(CONFIG_FILE).exists();

    fs::create_dir_all(&engram_dir)
        .await
        .with_context(|| format!("Failed to create {}", engram_dir.display()))?;

    let config_written = if already_initialized && !args.force {
        false
    } else {
        write_default_config(&engram_dir).await?;
        true
    };

    // Migrations are idempotent; existing history is never touched.
    let database_path = engram_dir.join(DATABASE_FILE);
    let db_url = format!("sqlite:{}", database_path.display());
    let pool = initialize_database(&db_url, None).await.context("Failed to initialize database")?;
    pool.close().await;

    let message = match (already_initialized, args.force) {
        (false, _) => "Project initialized successfully.",
        (true, true) => "Project reinitialized; config reset to defaults.",
        (true, false) => "Project already initialized. Use --force to reset config.yaml.",
    };

    tracing::info!(path = %target_path.display(), config_written, "project initialized");

    let output_data = InitOutput {
        success: true,
        message: message.to_string(),
        initialized_path: target_path,
        config_written,
        database_path,
    };
    output(&output_data, json_mode);
    Ok(())
}

async fn write_default_config(engram_dir: &Path) -> Result<()> {
    let body = serde_yaml::to_string(&Config::default()).context("Failed to render default config")?;
    let path = engram_dir.join(CONFIG_FILE);
    fs::write(&path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

//! Request Log Filter command line
//!
//! Loads captured request logs, scope configuration and parsed search
//! expressions from JSON files and prints the ids of the logs that pass.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reqlog_common::{Expression, RequestLog};
use reqlog_core::{filter_logs, standard_fields, RequestLogFilter, Scope, ScopeConfig};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod logging;

pub use logging::{init_logging, LoggingConfig};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print ids of logs matching a search expression
    Search {
        /// JSON array of request logs
        #[arg(long)]
        logs: PathBuf,

        /// JSON search expression tree
        #[arg(long)]
        expr: PathBuf,
    },

    /// Print ids of logs inside the scope
    Scope {
        /// JSON array of request logs
        #[arg(long)]
        logs: PathBuf,

        /// JSON scope configuration
        #[arg(long)]
        scope: PathBuf,
    },

    /// Print ids of logs passing an optional scope and an optional expression
    Filter {
        /// JSON array of request logs
        #[arg(long)]
        logs: PathBuf,

        /// JSON scope configuration; only in-scope logs are kept when given
        #[arg(long)]
        scope: Option<PathBuf>,

        /// JSON search expression tree
        #[arg(long)]
        expr: Option<PathBuf>,
    },

    /// List the searchable field names
    Fields,
}

impl Args {
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::with_level(self.log_level.clone(), self.json_logs)
    }
}

/// Execute `command`, writing results to `out` one per line
pub fn run(command: &Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Search { logs, expr } => {
            let filter = RequestLogFilter::new().with_search_expr(load_expression(expr)?);
            run_filter(logs, &filter, &Scope::default(), out)
        }
        Command::Scope { logs, scope } => {
            let filter = RequestLogFilter::new().only_in_scope();
            run_filter(logs, &filter, &load_scope(scope)?, out)
        }
        Command::Filter { logs, scope, expr } => {
            let mut filter = RequestLogFilter::new();
            if let Some(expr) = expr {
                filter = filter.with_search_expr(load_expression(expr)?);
            }
            let scope = match scope {
                Some(path) => {
                    filter = filter.only_in_scope();
                    load_scope(path)?
                }
                None => Scope::default(),
            };
            run_filter(logs, &filter, &scope, out)
        }
        Command::Fields => {
            let fields = standard_fields();
            for key in fields.request_keys().chain(fields.response_keys()) {
                writeln!(out, "{}", key)?;
            }
            Ok(())
        }
    }
}

fn run_filter(
    logs_path: &Path,
    filter: &RequestLogFilter,
    scope: &Scope,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let logs = load_logs(logs_path)?;
    let kept = filter_logs(&logs, filter, scope).context("Failed to evaluate search expression")?;

    info!(
        total = logs.len(),
        kept = kept.len(),
        only_in_scope = filter.only_in_scope,
        "Filtered request logs"
    );

    for log in kept {
        writeln!(out, "{}", log.id)?;
    }
    Ok(())
}

pub fn load_logs(path: &Path) -> anyhow::Result<Vec<RequestLog>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request logs from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse request logs in {}", path.display()))
}

pub fn load_expression(path: &Path) -> anyhow::Result<Expression> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read search expression from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse search expression in {}", path.display()))
}

pub fn load_scope(path: &Path) -> anyhow::Result<Scope> {
    let config = ScopeConfig::from_json_file(path)
        .with_context(|| format!("Failed to load scope configuration from {}", path.display()))?;
    config
        .compile()
        .with_context(|| format!("Invalid scope configuration in {}", path.display()))
}

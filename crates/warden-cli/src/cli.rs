//! Argument parsing (§6): global flags plus the `init`/`validate`/`run`/
//! `status`/`approve` subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Template {
    Basic,
    PrReview,
}

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version)]
#[command(about = "Governed multi-step AI workflow orchestration")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (GLOBAL)
    #[arg(short = 'c', long, global = true, env = "BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (GLOBAL)
    #[arg(long, global = true, value_enum, default_value = "info", env = "BRIDGE_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Output format (GLOBAL)
    #[arg(long, global = true, value_enum, default_value = "text", env = "BRIDGE_OUTPUT")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a config file and example workflow
    Init {
        #[arg(long, value_enum, default_value = "basic")]
        template: Template,
        #[arg(long)]
        force: bool,
    },

    /// Check a workflow definition for structural errors
    Validate {
        #[arg(long)]
        workflow: PathBuf,
        /// Promote warnings to validation errors
        #[arg(long)]
        strict: bool,
    },

    /// Create and execute a run from a workflow definition
    Run {
        #[arg(long)]
        workflow: PathBuf,
        /// Parse and validate only; do not create or execute a run
        #[arg(long)]
        dry_run: bool,
        /// `key=value` trigger data, repeatable
        #[arg(long = "input", value_parser = parse_key_value)]
        inputs: Vec<(String, String)>,
        /// Block until the run reaches a terminal state
        #[arg(long)]
        wait: bool,
    },

    /// Show one run, or list active runs
    Status {
        run_id: Option<String>,
        #[arg(long)]
        all: bool,
        /// Re-poll and reprint until the run is terminal
        #[arg(long)]
        watch: bool,
    },

    /// Approve or reject a run awaiting approval
    Approve {
        run_id: String,
        #[arg(long)]
        reject: bool,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, env = "USER")]
        approver: Option<String>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for livy-cli.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use livy_client::SessionKind;

use crate::properties::Property;

/// livy-cli - Run Spark statements through a Livy server
#[derive(Parser, Debug, Clone)]
#[command(name = "livy-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Execute a single statement and exit
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Execute statements from a file (one per line) and exit
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Livy server URL (overrides settings)
    #[arg(long, env = "LIVY_URL")]
    pub url: Option<String>,

    /// User owning the sessions (default: settings username, then $USER)
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Interpreter name; sessions are remembered per user and interpreter
    #[arg(short = 'i', long, default_value = "pyspark")]
    pub interpreter: String,

    /// Session kind when it differs from the interpreter name
    ///
    /// Options: spark (scala), pyspark (python), sql (sparksql), sparkr (r)
    #[arg(short = 'k', long)]
    pub kind: Option<String>,

    /// Session property as name=value (repeatable), e.g. --conf driverMemory=2G
    #[arg(long = "conf", value_name = "NAME=VALUE")]
    pub conf: Vec<String>,

    /// Output results as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Only output result rows
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// Session kind from `--kind`, else from the interpreter name.
    pub fn resolve_kind(&self) -> Result<SessionKind> {
        let name = self.kind.as_deref().unwrap_or(&self.interpreter);
        name.parse::<SessionKind>().map_err(|e| {
            anyhow::anyhow!("Cannot run interpreter '{}': {}", self.interpreter, e)
        })
    }

    /// Properties given with `--conf`, or `None` when there are none.
    pub fn properties(&self) -> Result<Option<Vec<Property>>> {
        if self.conf.is_empty() {
            return Ok(None);
        }

        self.conf
            .iter()
            .map(|entry| {
                Property::parse_assignment(entry)
                    .ok_or_else(|| anyhow::anyhow!("Expected NAME=VALUE, got '{}'", entry))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

//! livy-cli - Run Spark statements through a Livy server
//!
//! Sessions are reused per user and interpreter across runs, so repeated
//! invocations land in the same Spark application until it goes idle.
//!
//! # Usage
//!
//! ```bash
//! # Build the CLI binary
//! cargo build --features cli --bin livy-cli
//!
//! # Execute a single statement
//! ./target/debug/livy-cli -e "spark.range(100).count()"
//!
//! # Spark SQL with a bigger driver
//! ./target/debug/livy-cli -i sparksql --conf driverMemory=4G -e "SHOW DATABASES"
//!
//! # JSON output for scripting
//! ./target/debug/livy-cli -e "1 + 1" --json | jq .
//!
//! # Statements from a file, one per line
//! ./target/debug/livy-cli -f statements.txt
//!
//! # Interactive REPL mode (when no -e or -f provided)
//! ./target/debug/livy-cli --url http://livy:8998
//! ```

use anyhow::Result;
use clap::Parser;

use livy_connector::cli::{execute_batch, execute_once, initialize, run_repl, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut ctx = initialize(&args).await?;

    let result = if let Some(ref code) = args.execute {
        execute_once(&mut ctx, code).await
    } else if let Some(ref file) = args.file {
        execute_batch(&mut ctx, file).await
    } else {
        run_repl(&mut ctx).await
    };

    ctx.shutdown().await?;

    result
}

//! CLI module for running statements against Livy from a terminal.
//!
//! # Architecture
//!
//! ```text
//! +-----------------+     +----------------+     +---------------+
//! | args/bootstrap  | --> | SparkConnector | --> | output.rs     |
//! | (settings, env) |     | (sessions)     |     | (print/JSON)  |
//! +-----------------+     +----------------+     +---------------+
//! ```
//!
//! # REPL Mode
//!
//! When no statement is provided via `-e` or `-f`, the CLI enters
//! interactive REPL mode. See `repl.rs` for details.

mod args;
mod bootstrap;
mod output;
mod repl;
mod runner;

pub use args::Args;
pub use bootstrap::{build_connector, initialize, CliContext};
pub use output::{print_json, print_result, render_table};
pub use repl::run_repl;
pub use runner::{execute_batch, execute_once};

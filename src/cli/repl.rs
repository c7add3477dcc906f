//! Lightweight REPL (Read-Eval-Print-Loop) for livy-cli.
//!
//! Provides an interactive mode when no statement is provided via `-e` or `-f`.
//! Supports commands:
//! - `/quit`, `/exit`, `/q` - Exit the REPL
//! - `/close` - Close the current session
//! - `/log` - Print the current session's log
//! - `/jobs` - List Spark jobs found in the session log
//! - `/reap` - Close the user's other idle sessions
//! - `/stats` - Print session counters
//!
//! Any other input is submitted as a statement.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use super::bootstrap::CliContext;
use super::output::print_json;
use super::runner::execute_once;
use crate::session::CloseOutcome;

/// REPL command variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Exit the REPL
    Quit,
    Close,
    Log,
    Jobs,
    Reap,
    Stats,
    /// Unknown command (will show help)
    Unknown(String),
    /// Code to run in the session
    Statement(String),
    /// Empty input (skip)
    Empty,
}

impl ReplCommand {
    /// Parse user input into a REPL command.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        if trimmed.starts_with('/') {
            match trimmed.to_lowercase().as_str() {
                "/quit" | "/exit" | "/q" => ReplCommand::Quit,
                "/close" => ReplCommand::Close,
                "/log" => ReplCommand::Log,
                "/jobs" => ReplCommand::Jobs,
                "/reap" => ReplCommand::Reap,
                "/stats" => ReplCommand::Stats,
                _ => ReplCommand::Unknown(trimmed.to_string()),
            }
        } else {
            ReplCommand::Statement(trimmed.to_string())
        }
    }
}

/// Run an interactive REPL session.
///
/// Returns when the user exits or on EOF (Ctrl+D).
pub async fn run_repl(ctx: &mut CliContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let interactive = atty::is(atty::Stream::Stdin);

    if interactive {
        eprintln!(
            "livy-cli interactive mode ({} as {})",
            ctx.connector.interpreter(),
            ctx.connector.owner()
        );
        eprintln!("Type /quit to exit\n");
    }

    loop {
        if interactive {
            print!("{}> ", ctx.connector.kind());
            stdout.flush()?;
        }

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF (Ctrl+D)
            if interactive {
                eprintln!("\nGoodbye!");
            }
            break;
        }

        let result = match ReplCommand::parse(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                if interactive {
                    eprintln!("Goodbye!");
                }
                break;
            }
            ReplCommand::Unknown(cmd) => {
                eprintln!("Unknown command: {}", cmd);
                eprintln!("Available: /quit, /close, /log, /jobs, /reap, /stats");
                continue;
            }
            ReplCommand::Close => close_session(ctx).await,
            ReplCommand::Log => show_log(ctx).await,
            ReplCommand::Jobs => show_jobs(ctx).await,
            ReplCommand::Reap => {
                let closed = ctx.connector.reap_idle().await;
                eprintln!("Closed {} unused session(s)", closed);
                Ok(())
            }
            ReplCommand::Stats => print_json(&ctx.metrics.snapshot()),
            ReplCommand::Statement(code) => execute_once(ctx, &code).await,
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

async fn close_session(ctx: &mut CliContext) -> Result<()> {
    let Some(session) = ctx.session.take() else {
        eprintln!("No session to close");
        return Ok(());
    };

    match ctx.connector.close_session(&session).await {
        Ok(CloseOutcome::Closed) => eprintln!("Closed session {}", session.id),
        Ok(CloseOutcome::Abandoned) => {
            eprintln!("Session {} could not be closed, it may still be running", session.id)
        }
        Err(e) if e.is_session_expired() => eprintln!("Session {} was already gone", session.id),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn show_log(ctx: &CliContext) -> Result<()> {
    let log = ctx.connector.get_log(ctx.session.as_ref(), 0, None).await?;
    println!("{}", log.text());
    Ok(())
}

async fn show_jobs(ctx: &CliContext) -> Result<()> {
    let log = ctx.connector.get_log(ctx.session.as_ref(), 0, None).await?;
    let jobs = ctx.connector.get_jobs(ctx.session.as_ref(), &log.text()).await?;

    if ctx.args.json {
        return print_json(&jobs);
    }
    if jobs.is_empty() {
        eprintln!("No jobs found");
    }
    for job in jobs {
        println!("{}\t{}", job.name, job.url);
    }
    Ok(())
}

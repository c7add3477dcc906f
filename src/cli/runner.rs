//! CLI execution runner.
//!
//! Runs statements through the connector and prints their results.

use std::path::Path;

use anyhow::{Context, Result};
use livy_client::StatementState;

use super::bootstrap::CliContext;
use super::output::{print_json, print_result};
use crate::connector::ExecutionHandle;

/// Execute a single statement and wait for its result.
pub async fn execute_once(ctx: &mut CliContext, code: &str) -> Result<()> {
    let handle = submit(ctx, code).await?;

    let state = ctx
        .connector
        .wait_for(Some(&handle.session), handle.statement_id)
        .await?;

    if state != StatementState::Available {
        if ctx.args.json {
            print_json(&serde_json::json!({
                "statement": handle.statement_id,
                "state": state,
            }))?;
        }
        anyhow::bail!("Statement {} ended in state {}", handle.statement_id, state);
    }

    let payload = ctx
        .connector
        .fetch_result(Some(&handle.session), handle.statement_id, true)
        .await?;
    print_result(&payload, ctx.args.json, ctx.args.quiet)
}

/// Submit `code` in the user's session.
///
/// Sessions are always resolved with the run's `--conf` properties. If the
/// session turns out to be gone, a fresh one is resolved and the statement
/// is submitted once more.
async fn submit(ctx: &mut CliContext, code: &str) -> Result<ExecutionHandle> {
    let session = ctx.connector.create_session(ctx.properties.clone()).await?;

    let handle = match ctx.connector.execute(Some(&session), code).await {
        Err(e) if e.is_session_expired() => {
            tracing::info!("Session {} expired, retrying in a new session: {}", session.id, e);
            ctx.session = None;
            let session = ctx.connector.create_session(ctx.properties.clone()).await?;
            ctx.connector.execute(Some(&session), code).await?
        }
        other => other?,
    };
    ctx.session = Some(handle.session.clone());
    Ok(handle)
}

/// Execute statements from a file, one per line.
///
/// Each non-empty line that does not start with `--` is executed in order.
/// Execution stops on the first error.
pub async fn execute_batch(ctx: &mut CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read statement file: {}", file_path.display()))?;

    let statements = parse_statements(&content);
    if statements.is_empty() {
        anyhow::bail!("No statements found in file: {}", file_path.display());
    }

    let total = statements.len();
    if !ctx.args.quiet {
        eprintln!(
            "[batch] Executing {} statement(s) from {}",
            total,
            file_path.display()
        );
    }

    for (i, statement) in statements.iter().enumerate() {
        if !ctx.args.quiet {
            eprintln!(
                "\n[batch] [{}/{}] Executing: {}",
                i + 1,
                total,
                truncate(statement, 50)
            );
        }

        execute_once(ctx, statement).await?;
    }

    if !ctx.args.quiet {
        eprintln!("\n[batch] All {} statement(s) completed successfully", total);
    }

    Ok(())
}

fn parse_statements(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .collect()
}

/// Truncate a string for display
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

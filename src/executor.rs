//! Statement submission, status polling and result retrieval.

use std::sync::Arc;

use livy_client::{LivyError, SessionLog, Statement, StatementId, StatementState};

use crate::error::{classify, error_chain_text, ErrorKind, Result, SparkError};
use crate::metrics::SessionMetrics;
use crate::result::{normalize, ResultPayload};
use crate::session::{PollConfig, Session};
use crate::service::RemoteSessionService;

/// Runs statements against sessions the caller already resolved.
pub struct StatementExecutor {
    service: Arc<dyn RemoteSessionService>,
    metrics: Arc<SessionMetrics>,
    poll: PollConfig,
}

impl StatementExecutor {
    pub fn new(service: Arc<dyn RemoteSessionService>, metrics: Arc<SessionMetrics>) -> Self {
        Self {
            service,
            metrics,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Submit `code` to the session.
    ///
    /// Errors saying the session is gone, unreachable or busy become
    /// [`SparkError::SessionExpired`] so the caller can resolve a fresh
    /// session and retry.
    pub async fn submit(&self, session: &Session, code: &str) -> Result<Statement> {
        match self.service.submit_statement(session.id, code.to_string()).await {
            Ok(statement) => {
                tracing::debug!(
                    "Submitted statement {} to Livy session {}",
                    statement.id,
                    session.id
                );
                self.metrics.record_submitted();
                Ok(statement)
            }
            Err(e) if classify(&error_chain_text(&e)).is_recoverable() => {
                self.metrics.record_expired();
                Err(SparkError::SessionExpired(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current state of a statement.
    pub async fn status(&self, session: &Session, statement: StatementId) -> Result<Statement> {
        self.service
            .fetch_statement(session.id, statement)
            .await
            .map_err(|e| self.not_found_as_expired(e))
    }

    /// Poll a statement until it leaves `waiting`/`running` or the attempts run out.
    ///
    /// Returns the last observed statement. A statement still pending after
    /// the last attempt is returned as is; the caller decides what to do.
    pub async fn poll_until_done(&self, session: &Session, statement: StatementId) -> Result<Statement> {
        let mut current = self.status(session, statement).await?;
        let mut attempts = 0;

        while current.state.is_pending() && attempts < self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;
            current = self.status(session, statement).await?;
            attempts += 1;
        }

        if current.state.is_pending() {
            tracing::warn!(
                "Statement {} in session {} still {} after {} poll(s)",
                statement,
                session.id,
                current.state,
                attempts
            );
        }
        Ok(current)
    }

    /// Fetch and normalize a statement's result.
    pub async fn fetch_result(
        &self,
        session: &Session,
        statement: StatementId,
        start_over: bool,
    ) -> Result<ResultPayload> {
        let fetched = self.status(session, statement).await?;
        let output = fetched.output.as_ref().ok_or_else(|| {
            SparkError::InvalidPayload(format!(
                "statement {} is {} and has no output",
                statement, fetched.state
            ))
        })?;
        normalize(output, start_over)
    }

    /// Wait for a statement and return its full result if it became available.
    pub async fn check_status_and_fetch(
        &self,
        session: &Session,
        statement: StatementId,
    ) -> Result<Option<ResultPayload>> {
        let finished = self.poll_until_done(session, statement).await?;
        if finished.state != StatementState::Available {
            return Ok(None);
        }
        self.fetch_result(session, statement, true).await.map(Some)
    }

    /// Submit `code`, wait for it and return its result.
    pub async fn run(&self, session: &Session, code: &str) -> Result<Option<ResultPayload>> {
        let statement = self.submit(session, code).await?;
        self.check_status_and_fetch(session, statement.id).await
    }

    /// Ask the remote service to cancel a statement. Failures are only logged.
    pub async fn cancel(&self, session: &Session, statement: StatementId) {
        if let Err(e) = self.service.cancel_statement(session.id, statement).await {
            tracing::debug!(
                "Failed to cancel statement {} in session {}: {}",
                statement,
                session.id,
                e
            );
        }
    }

    /// Read the session log. Failures are logged and yield an empty log.
    pub async fn get_log(&self, session: &Session, from: u64, size: Option<u64>) -> SessionLog {
        match self.service.get_log(session.id, from, size).await {
            Ok(log) => log,
            Err(e) => {
                tracing::debug!("Failed to read log of session {}: {}", session.id, e);
                SessionLog {
                    id: session.id,
                    from,
                    ..SessionLog::default()
                }
            }
        }
    }

    fn not_found_as_expired(&self, e: LivyError) -> SparkError {
        if classify(&error_chain_text(&e)) == ErrorKind::SessionNotFound {
            self.metrics.record_expired();
            SparkError::SessionExpired(e.to_string())
        } else {
            e.into()
        }
    }
}

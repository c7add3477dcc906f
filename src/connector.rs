//! Per-user entry point tying sessions, statements and log scraping together.
//!
//! A [`SparkConnector`] serves one user on one interpreter. Every operation
//! that needs a session first makes sure it is still alive, falling back to
//! the session remembered for the user.

use std::sync::Arc;

use livy_client::{SessionKind, SessionLog, StatementId, StatementState};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::executor::StatementExecutor;
use crate::jobs::{DeploymentMode, Job, LogJobExtractor};
use crate::properties::Property;
use crate::result::{Column, ResultPayload};
use crate::session::{CloseOutcome, Session, SessionLifecycleManager};

/// Rows read by sample queries
pub const SAMPLE_LIMIT: usize = 100;

/// Log lines scanned for YARN tracking URLs
const YARN_LOG_LINES: u64 = 100;

/// A statement accepted by the remote service.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionHandle {
    /// The session the statement actually runs in
    pub session: Session,
    pub statement_id: StatementId,
    pub has_result_set: bool,
}

/// Catalog entries for one autocomplete level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Autocomplete {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
}

pub struct SparkConnector {
    owner: String,
    interpreter: String,
    kind: SessionKind,
    sessions: Arc<SessionLifecycleManager>,
    executor: Arc<StatementExecutor>,
    jobs: LogJobExtractor,
}

impl SparkConnector {
    pub fn new(
        owner: impl Into<String>,
        interpreter: impl Into<String>,
        kind: SessionKind,
        sessions: Arc<SessionLifecycleManager>,
        executor: Arc<StatementExecutor>,
    ) -> Self {
        Self {
            owner: owner.into(),
            interpreter: interpreter.into(),
            kind,
            sessions,
            executor,
            jobs: LogJobExtractor::default(),
        }
    }

    pub fn with_deployment_mode(mut self, mode: DeploymentMode) -> Self {
        self.jobs = LogJobExtractor::new(mode);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Return the user's live session, creating one with `properties` if needed.
    pub async fn create_session(&self, properties: Option<Vec<Property>>) -> Result<Session> {
        self.sessions
            .resolve_or_create(&self.owner, &self.interpreter, self.kind, properties)
            .await
    }

    /// Submit `code`, in `session` if it is still usable, otherwise in the
    /// user's stored or a new session.
    pub async fn execute(&self, session: Option<&Session>, code: &str) -> Result<ExecutionHandle> {
        let session = match session {
            Some(session) => self.sessions.validate(session).await,
            None => None,
        };
        let session = match session {
            Some(session) => session,
            None => self.create_session(None).await?,
        };

        let statement = self.executor.submit(&session, code).await?;
        Ok(ExecutionHandle {
            session,
            statement_id: statement.id,
            has_result_set: true,
        })
    }

    pub async fn check_status(
        &self,
        session: Option<&Session>,
        statement: StatementId,
    ) -> Result<StatementState> {
        let session = self.health_check(session).await?;
        Ok(self.executor.status(&session, statement).await?.state)
    }

    /// Poll a statement until it finishes or the polling bounds run out.
    pub async fn wait_for(
        &self,
        session: Option<&Session>,
        statement: StatementId,
    ) -> Result<StatementState> {
        let session = self.health_check(session).await?;
        Ok(self.executor.poll_until_done(&session, statement).await?.state)
    }

    /// Fetch a statement's result, then close the user's unused sessions.
    pub async fn fetch_result(
        &self,
        session: Option<&Session>,
        statement: StatementId,
        start_over: bool,
    ) -> Result<ResultPayload> {
        let session = self.health_check(session).await?;
        let payload = self
            .executor
            .fetch_result(&session, statement, start_over)
            .await?;

        self.reap_unused().await;
        Ok(payload)
    }

    /// Cancel a statement. Remote failures are only logged.
    pub async fn cancel(&self, session: Option<&Session>, statement: StatementId) -> Result<()> {
        let session = self.health_check(session).await?;
        self.executor.cancel(&session, statement).await;
        Ok(())
    }

    /// Read the session log. Remote failures yield an empty log.
    pub async fn get_log(
        &self,
        session: Option<&Session>,
        from: u64,
        size: Option<u64>,
    ) -> Result<SessionLog> {
        let session = self.health_check(session).await?;
        Ok(self.executor.get_log(&session, from, size).await)
    }

    pub async fn close_session(&self, session: &Session) -> Result<CloseOutcome> {
        self.sessions
            .close(&self.owner, &self.interpreter, session.id)
            .await
    }

    /// Jobs started by the session.
    ///
    /// On YARN the tracking URL only shows up at the start of the session log,
    /// so the first lines are read from the service and `logs` is ignored.
    pub async fn get_jobs(&self, session: Option<&Session>, logs: &str) -> Result<Vec<Job>> {
        match self.jobs.mode() {
            DeploymentMode::Yarn => {
                let start = self.get_log(session, 0, Some(YARN_LOG_LINES)).await?;
                Ok(self.jobs.extract(&start.text()))
            }
            DeploymentMode::Local => Ok(self.jobs.extract(logs)),
        }
    }

    /// `session` if it is alive, else the stored session, else `SessionExpired`.
    pub async fn health_check(&self, session: Option<&Session>) -> Result<Session> {
        self.sessions
            .health_check(&self.owner, &self.interpreter, session)
            .await
    }

    /// Close the user's other idle or finished sessions.
    pub async fn reap_idle(&self) -> usize {
        self.sessions.reap_idle(&self.owner, &self.interpreter).await
    }

    /// List databases, tables of `database`, or columns of `database.table`.
    pub async fn autocomplete(
        &self,
        database: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<Autocomplete> {
        self.reap_unused().await;
        let session = self.create_session(None).await?;

        let mut response = Autocomplete::default();
        match (database, table, column) {
            (None, _, _) => {
                let result = self.executor.run(&session, "SHOW DATABASES").await?;
                response.databases = Some(column_values(result.as_ref(), 0));
            }
            (Some(database), None, _) => {
                self.use_database(&session, database).await?;
                let result = self.executor.run(&session, "SHOW TABLES").await?;
                response.tables = Some(column_values(result.as_ref(), 1));
            }
            (Some(database), Some(table), None) => {
                self.use_database(&session, database).await?;
                let result = self
                    .executor
                    .run(&session, &format!("DESCRIBE {}", table))
                    .await?;
                response.columns = Some(describe_columns(result.as_ref()));
            }
            _ => {}
        }
        Ok(response)
    }

    /// Run a sample query on `database.table` and return its rows.
    ///
    /// Returns `None` when the query did not finish within the polling bounds.
    pub async fn sample_data(
        &self,
        database: &str,
        table: &str,
        column: Option<&str>,
        operation: Option<&str>,
    ) -> Result<Option<ResultPayload>> {
        self.reap_unused().await;
        let session = self.create_session(None).await?;

        let statement = select_query(database, table, column, operation, SAMPLE_LIMIT);
        self.executor.run(&session, &statement).await
    }

    /// Query a user can run to browse `database.table`.
    pub fn browse_query(&self, database: &str, table: &str) -> String {
        select_query(database, table, None, None, SAMPLE_LIMIT)
    }

    async fn use_database(&self, session: &Session, database: &str) -> Result<()> {
        self.executor
            .run(session, &format!("USE {}", database))
            .await?;
        Ok(())
    }

    /// Reap only once the user has a stored session to keep.
    async fn reap_unused(&self) {
        if self.sessions.has_stored_session(&self.owner, &self.interpreter) {
            self.reap_idle().await;
        }
    }
}

/// `SELECT` statement reading the first `limit` rows of `database.table`.
///
/// The `hello` operation returns a constant query used to warm up sessions.
pub fn select_query(
    database: &str,
    table: &str,
    column: Option<&str>,
    operation: Option<&str>,
    limit: usize,
) -> String {
    if operation == Some("hello") {
        return "SELECT 'Hello World!'".to_string();
    }

    let column = column.filter(|c| !c.is_empty()).unwrap_or("*");
    format!(
        "SELECT {}\nFROM {}.{}\nLIMIT {}\n",
        column, database, table, limit
    )
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn column_values(result: Option<&ResultPayload>, index: usize) -> Vec<String> {
    result
        .map(|payload| {
            payload
                .rows
                .iter()
                .filter_map(|row| row.get(index))
                .map(cell_text)
                .collect()
        })
        .unwrap_or_default()
}

fn describe_columns(result: Option<&ResultPayload>) -> Vec<Column> {
    result
        .map(|payload| {
            payload
                .rows
                .iter()
                .filter_map(|row| match (row.first(), row.get(1)) {
                    (Some(name), Some(data_type)) => {
                        Some(Column::new(cell_text(name), cell_text(data_type)))
                    }
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

//! The remote session service seen by the lifecycle manager and executor.
//!
//! Production code talks to Livy through [`livy_client::Client`]; tests use a
//! scripted in-memory double.

use async_trait::async_trait;
use livy_client::{
    CreateSession, LivyError, SessionId, SessionInfo, SessionLog, Statement, StatementId,
};

/// Operations the connector needs from a Livy-like session service.
///
/// # Object Safety
/// This trait is object-safe and intended to be used as
/// `Arc<dyn RemoteSessionService>`.
#[async_trait]
pub trait RemoteSessionService: Send + Sync + 'static {
    async fn create_session(&self, request: CreateSession) -> Result<SessionInfo, LivyError>;

    async fn get_session(&self, id: SessionId) -> Result<SessionInfo, LivyError>;

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, LivyError>;

    async fn close_session(&self, id: SessionId) -> Result<(), LivyError>;

    async fn submit_statement(&self, id: SessionId, code: String) -> Result<Statement, LivyError>;

    async fn fetch_statement(
        &self,
        id: SessionId,
        statement: StatementId,
    ) -> Result<Statement, LivyError>;

    async fn cancel_statement(&self, id: SessionId, statement: StatementId) -> Result<(), LivyError>;

    async fn get_log(
        &self,
        id: SessionId,
        from: u64,
        size: Option<u64>,
    ) -> Result<SessionLog, LivyError>;
}

#[async_trait]
impl RemoteSessionService for livy_client::Client {
    async fn create_session(&self, request: CreateSession) -> Result<SessionInfo, LivyError> {
        livy_client::Client::create_session(self, &request).await
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionInfo, LivyError> {
        livy_client::Client::get_session(self, id).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, LivyError> {
        Ok(livy_client::Client::list_sessions(self).await?.sessions)
    }

    async fn close_session(&self, id: SessionId) -> Result<(), LivyError> {
        livy_client::Client::close_session(self, id).await
    }

    async fn submit_statement(&self, id: SessionId, code: String) -> Result<Statement, LivyError> {
        livy_client::Client::submit_statement(self, id, code).await
    }

    async fn fetch_statement(
        &self,
        id: SessionId,
        statement: StatementId,
    ) -> Result<Statement, LivyError> {
        livy_client::Client::get_statement(self, id, statement).await
    }

    async fn cancel_statement(&self, id: SessionId, statement: StatementId) -> Result<(), LivyError> {
        livy_client::Client::cancel_statement(self, id, statement).await
    }

    async fn get_log(
        &self,
        id: SessionId,
        from: u64,
        size: Option<u64>,
    ) -> Result<SessionLog, LivyError> {
        livy_client::Client::get_log(self, id, from, size).await
    }
}

//! HTTP client for the Livy REST API.

use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::LivyError;
use crate::types::{
    CreateSession, ErrorBody, SessionId, SessionInfo, SessionList, SessionLog, Statement,
    StatementId, SubmitStatement,
};

/// Header Livy requires on mutating requests when CSRF protection is enabled.
const REQUESTED_BY_HEADER: &str = "X-Requested-By";

/// Client for a single Livy server.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// Server root, always ending in `/`
    base_url: Url,
    /// Value sent as `X-Requested-By`
    requested_by: Option<String>,
    /// HTTP basic auth credentials
    credentials: Option<(String, Option<String>)>,
}

impl Client {
    /// Create a client for the Livy server at `base_url`.
    ///
    /// # Example
    /// ```rust,no_run
    /// use livy_client::Client;
    ///
    /// # fn example() -> Result<(), livy_client::LivyError> {
    /// let client = Client::new("http://livy.example.com:8998")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(base_url: &str) -> Result<Self, LivyError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(LivyError::HttpError)?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            requested_by: None,
            credentials: None,
        })
    }

    /// Apply a per-request timeout to every call.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, LivyError> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LivyError::HttpError)?;
        Ok(self)
    }

    /// Send `X-Requested-By` on every request.
    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }

    /// Authenticate with HTTP basic auth.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    /// Get the server root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /sessions`
    pub async fn create_session(&self, request: &CreateSession) -> Result<SessionInfo, LivyError> {
        tracing::debug!("Creating {} session", request.kind);
        let url = self.endpoint("sessions")?;
        self.send_json(self.http_client.post(url).json(request)).await
    }

    /// `GET /sessions/{id}`
    pub async fn get_session(&self, id: SessionId) -> Result<SessionInfo, LivyError> {
        let url = self.endpoint(&format!("sessions/{}", id))?;
        self.send_json(self.http_client.get(url)).await
    }

    /// `GET /sessions`
    pub async fn list_sessions(&self) -> Result<SessionList, LivyError> {
        let url = self.endpoint("sessions")?;
        self.send_json(self.http_client.get(url)).await
    }

    /// `DELETE /sessions/{id}`
    pub async fn close_session(&self, id: SessionId) -> Result<(), LivyError> {
        let url = self.endpoint(&format!("sessions/{}", id))?;
        self.send(self.http_client.delete(url)).await.map(|_| ())
    }

    /// `POST /sessions/{id}/statements`
    pub async fn submit_statement(
        &self,
        id: SessionId,
        code: impl Into<String>,
    ) -> Result<Statement, LivyError> {
        let url = self.endpoint(&format!("sessions/{}/statements", id))?;
        let body = SubmitStatement {
            code: code.into(),
            kind: None,
        };
        self.send_json(self.http_client.post(url).json(&body)).await
    }

    /// `GET /sessions/{id}/statements/{statement}`
    pub async fn get_statement(
        &self,
        id: SessionId,
        statement: StatementId,
    ) -> Result<Statement, LivyError> {
        let url = self.endpoint(&format!("sessions/{}/statements/{}", id, statement))?;
        self.send_json(self.http_client.get(url)).await
    }

    /// `POST /sessions/{id}/statements/{statement}/cancel`
    pub async fn cancel_statement(
        &self,
        id: SessionId,
        statement: StatementId,
    ) -> Result<(), LivyError> {
        let url = self.endpoint(&format!("sessions/{}/statements/{}/cancel", id, statement))?;
        self.send(self.http_client.post(url)).await.map(|_| ())
    }

    /// `GET /sessions/{id}/log?from=..&size=..`
    pub async fn get_log(
        &self,
        id: SessionId,
        from: u64,
        size: Option<u64>,
    ) -> Result<SessionLog, LivyError> {
        let mut url = self.endpoint(&format!("sessions/{}/log", id))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("from", &from.to_string());
            if let Some(size) = size {
                query.append_pair("size", &size.to_string());
            }
        }
        self.send_json(self.http_client.get(url)).await
    }

    /// Resolve a path relative to the server root.
    fn endpoint(&self, path: &str) -> Result<Url, LivyError> {
        Ok(self.base_url.join(path)?)
    }

    /// Attach the headers and credentials every request carries.
    fn decorate(&self, mut request: RequestBuilder) -> Result<RequestBuilder, LivyError> {
        if let Some(ref requested_by) = self.requested_by {
            let value = HeaderValue::from_str(requested_by)
                .map_err(|e| LivyError::ConfigError(e.to_string()))?;
            request = request.header(REQUESTED_BY_HEADER, value);
        }

        if let Some((ref username, ref password)) = self.credentials {
            request = request.basic_auth(username, password.as_ref());
        }

        Ok(request)
    }

    /// Send a request and fail on non-2xx responses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, LivyError> {
        let response = self.decorate(request)?.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        tracing::debug!("Livy returned {}: {}", status, message);
        Err(LivyError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    /// Send a request and decode its JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, LivyError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("requested_by", &self.requested_by)
            .finish_non_exhaustive()
    }
}

/// Parse the server root and make sure relative joins append to its path.
fn normalize_base_url(base_url: &str) -> Result<Url, LivyError> {
    let mut url = Url::parse(base_url.trim())?;
    if url.cannot_be_a_base() {
        return Err(LivyError::ConfigError(format!(
            "Livy URL '{}' cannot be used as a base URL",
            base_url
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull the human-readable message out of a Livy error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => Some(parsed.msg),
        Err(_) => Some(trimmed.to_string()),
    }
}

use std::sync::Arc;

use chrono::Utc;
use livy_client::{LivyError, SessionId, SessionInfo, SessionKind, SessionState};

use super::{PollConfig, Session};
use crate::error::{Result, SparkError};
use crate::metrics::SessionMetrics;
use crate::properties::{
    livy_request, merge_properties, to_properties, Property, PropertyDefinition, SPARK_PROPERTIES,
};
use crate::service::RemoteSessionService;
use crate::store::{SessionKey, SessionRecord, SessionStore};

/// Message returned when neither the given nor the stored session is usable.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please create new session and try again.";

/// States in which another session of the same user is closed by `reap_idle`.
const REAPABLE_STATES: [SessionState; 5] = [
    SessionState::Idle,
    SessionState::ShuttingDown,
    SessionState::Error,
    SessionState::Dead,
    SessionState::Killed,
];

/// Result of closing a remote session that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The remote service accepted the close request
    Closed,
    /// The close request failed for a reason other than the session being
    /// gone; the session may still be alive remotely
    Abandoned,
}

/// Owns the lifecycle of remote sessions on behalf of users.
///
/// The remote service is the authority on session state. The store only
/// remembers which session a user last used, per interpreter.
pub struct SessionLifecycleManager {
    service: Arc<dyn RemoteSessionService>,
    store: Arc<dyn SessionStore>,
    metrics: Arc<SessionMetrics>,
    definitions: &'static [PropertyDefinition],
    user_defaults: Option<Vec<Property>>,
    poll: PollConfig,
}

impl SessionLifecycleManager {
    pub fn new(
        service: Arc<dyn RemoteSessionService>,
        store: Arc<dyn SessionStore>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            service,
            store,
            metrics,
            definitions: SPARK_PROPERTIES,
            user_defaults: None,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Properties used when a caller creates a session without any.
    pub fn with_user_defaults(mut self, properties: Vec<Property>) -> Self {
        self.user_defaults = Some(properties);
        self
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Return the user's usable session for `interpreter`, creating one if needed.
    ///
    /// A stored session is reused as long as the remote service reports it in
    /// a usable state. Otherwise a new session is created with the merged
    /// properties and waited on until it leaves `starting`.
    pub async fn resolve_or_create(
        &self,
        owner: &str,
        interpreter: &str,
        kind: SessionKind,
        properties: Option<Vec<Property>>,
    ) -> Result<Session> {
        if let Some(session) = self.stored_session(owner, interpreter).await? {
            tracing::debug!(
                "Reusing Livy session {} ({}) for {}",
                session.id,
                session.state,
                owner
            );
            self.metrics.record_reused();
            return Ok(session);
        }

        self.create(owner, interpreter, kind, properties).await
    }

    /// The session stored for the user, if the remote service still reports it usable.
    pub async fn stored_session(&self, owner: &str, interpreter: &str) -> Result<Option<Session>> {
        let key = SessionKey::new(owner, interpreter);
        let Some(record) = self.store.get(&key)? else {
            return Ok(None);
        };

        Ok(self.check_session(record.id).await.map(|info| Session {
            id: record.id,
            kind: record.kind,
            state: info.state,
            owner: owner.to_string(),
            properties: record.properties,
        }))
    }

    /// Whether a session is remembered for the user, without checking it remotely.
    pub fn has_stored_session(&self, owner: &str, interpreter: &str) -> bool {
        match self.store.get(&SessionKey::new(owner, interpreter)) {
            Ok(record) => record.is_some(),
            Err(e) => {
                tracing::warn!("Failed to read session store: {}", e);
                false
            }
        }
    }

    /// Re-read `session` from the remote service.
    ///
    /// Returns the session with its current state, or `None` if it is gone
    /// or unusable.
    pub async fn validate(&self, session: &Session) -> Option<Session> {
        self.check_session(session.id)
            .await
            .map(|info| session.with_state(info.state))
    }

    /// Resolve a usable session from `session` or the store, without creating one.
    pub async fn health_check(
        &self,
        owner: &str,
        interpreter: &str,
        session: Option<&Session>,
    ) -> Result<Session> {
        if let Some(session) = session {
            if let Some(valid) = self.validate(session).await {
                return Ok(valid);
            }
        }

        if let Some(stored) = self.stored_session(owner, interpreter).await? {
            return Ok(stored);
        }

        self.metrics.record_expired();
        Err(SparkError::SessionExpired(SESSION_EXPIRED_MESSAGE.to_string()))
    }

    /// Close session `id` and forget it for the user if it is the stored one.
    ///
    /// A 404 or 500 from the remote service means the session is already gone
    /// and surfaces as [`SparkError::SessionExpired`]. Other failures are
    /// logged and reported as [`CloseOutcome::Abandoned`].
    pub async fn close(&self, owner: &str, interpreter: &str, id: SessionId) -> Result<CloseOutcome> {
        let key = SessionKey::new(owner, interpreter);
        let result = self.service.close_session(id).await;

        // Runs whatever the remote outcome was
        match self.store.remove_if_id(&key, id) {
            Ok(true) => tracing::debug!("Forgot session {} for {}", id, key),
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to update session store for {}: {}", key, e),
        }

        match result {
            Ok(()) => {
                tracing::info!("Closed Livy session {}", id);
                self.metrics.record_closed();
                Ok(CloseOutcome::Closed)
            }
            Err(e) if matches!(e.status(), Some(404) | Some(500)) => {
                self.metrics.record_expired();
                Err(SparkError::SessionExpired(e.to_string()))
            }
            Err(e) => {
                tracing::warn!("Failed to close Livy session {}: {}", id, e);
                Ok(CloseOutcome::Abandoned)
            }
        }
    }

    /// Close the user's other sessions that are idle or finished.
    ///
    /// The session stored for `interpreter` is never touched. Individual
    /// failures are logged and skipped. Returns how many sessions were closed.
    pub async fn reap_idle(&self, owner: &str, interpreter: &str) -> usize {
        let key = SessionKey::new(owner, interpreter);
        let stored_id = match self.store.get(&key) {
            Ok(record) => record.map(|r| r.id),
            Err(e) => {
                tracing::warn!("Skipping session cleanup for {}: {}", key, e);
                return 0;
            }
        };

        let sessions = match self.service.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("Failed to list Livy sessions: {}", e);
                return 0;
            }
        };

        let candidates: Vec<SessionId> = sessions
            .iter()
            .filter(|info| info.owner.as_deref() == Some(owner))
            .filter(|info| Some(info.id) != stored_id)
            .filter(|info| REAPABLE_STATES.contains(&info.state))
            .map(|info| info.id)
            .collect();

        let mut closed = 0;
        for id in candidates {
            match self.close(owner, interpreter, id).await {
                Ok(CloseOutcome::Closed) => closed += 1,
                Ok(CloseOutcome::Abandoned) => {}
                Err(e) => tracing::debug!("Could not close unused session {}: {}", id, e),
            }
        }

        if closed > 0 {
            tracing::info!("Closed {} unused Livy session(s) for {}", closed, owner);
            self.metrics.record_reaped(closed as u64);
        }
        closed
    }

    /// Fetch session `id` and keep it only if it is in a usable state.
    async fn check_session(&self, id: SessionId) -> Option<SessionInfo> {
        match self.service.get_session(id).await {
            Ok(info) if info.state.is_usable() => Some(info),
            Ok(info) => {
                tracing::debug!("Livy session {} is {}", id, info.state);
                None
            }
            Err(e) => {
                tracing::debug!("Livy session {} is not available: {}", id, e);
                None
            }
        }
    }

    async fn create(
        &self,
        owner: &str,
        interpreter: &str,
        kind: SessionKind,
        properties: Option<Vec<Property>>,
    ) -> Result<Session> {
        let overrides = properties
            .filter(|p| !p.is_empty())
            .or_else(|| self.user_defaults.clone())
            .unwrap_or_default();
        let merged = merge_properties(self.definitions, &overrides);
        let request = livy_request(kind, &merged);

        let created = self.service.create_session(request).await?;
        tracing::info!("Created Livy session {} ({}) for {}", created.id, kind, owner);

        let info = match self.wait_until_started(created.id).await {
            Ok(info) => info,
            Err(e) => {
                self.metrics.record_creation_failure();
                return Err(e.into());
            }
        };

        if info.state != SessionState::Idle {
            self.metrics.record_creation_failure();
            let log = if info.log.is_empty() {
                "timeout".to_string()
            } else {
                info.log.join("\n")
            };
            tracing::warn!("Livy session {} did not start: {}", info.id, info.state);
            return Err(SparkError::SessionCreation {
                state: info.state,
                log,
            });
        }

        let stored_properties = to_properties(self.definitions, &merged);
        let key = SessionKey::new(owner, interpreter);
        self.store.put(
            &key,
            SessionRecord {
                kind,
                id: info.id,
                properties: stored_properties.clone(),
                created_at: Utc::now(),
            },
        )?;
        self.metrics.record_created();

        Ok(Session {
            id: info.id,
            kind,
            state: info.state,
            owner: owner.to_string(),
            properties: stored_properties,
        })
    }

    /// Poll a new session until it leaves `starting` or the attempts run out.
    async fn wait_until_started(&self, id: SessionId) -> std::result::Result<SessionInfo, LivyError> {
        let mut info = self.service.get_session(id).await?;
        let mut attempts = 0;

        while info.state == SessionState::Starting && attempts < self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;
            info = self.service.get_session(id).await?;
            attempts += 1;
        }

        tracing::debug!(
            "Livy session {} is {} after {} poll(s)",
            id,
            info.state,
            attempts
        );
        Ok(info)
    }
}

//! Remote session lifecycle: resolution, creation, health checks and reaping.
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------+
//! |  SessionLifecycleManager                   |
//! |    +-- SessionStore   (affinity hint)      |
//! |    +-- RemoteSessionService (authority)    |
//! +--------------------------------------------+
//! ```
//!
//! # Concurrency
//!
//! `resolve_or_create` takes no lock per key. Two concurrent requests for the
//! same user and interpreter can both create a session; the last one to
//! persist wins the store entry and the other becomes an orphan that
//! `reap_idle` closes on a later sweep.

mod manager;

use std::time::Duration;

use livy_client::{SessionId, SessionKind, SessionState};
use serde::{Deserialize, Serialize};

use crate::properties::Property;

pub use manager::{CloseOutcome, SessionLifecycleManager};

/// Default wait between two polls of the remote service
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of polls before giving up
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;

/// Bounds for the polling loops that wait on remote state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// A remote session as last observed by the connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub state: SessionState,
    pub owner: String,
    pub properties: Vec<Property>,
}

impl Session {
    /// Copy of this session with a freshly observed state.
    pub fn with_state(&self, state: SessionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_bounds() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval, Duration::from_secs(1));
        assert_eq!(poll.max_attempts, 120);
    }
}

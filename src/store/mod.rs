//! Per-user session affinity storage.
//!
//! The store remembers which remote session a user last used for an
//! interpreter. It is only a hint: every stored id is re-checked against the
//! remote service before it is reused.

mod file;
mod memory;

use std::fmt;

use chrono::{DateTime, Utc};
use livy_client::{SessionId, SessionKind};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::properties::Property;

pub use file::{default_store_path, FileSessionStore};
pub use memory::InMemorySessionStore;

/// Lookup key for a user's session on one interpreter: `<username>-<interpreter>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(username: &str, interpreter: &str) -> Self {
        Self(format!("{}-{}", username, interpreter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is remembered about a user's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub id: SessionId,
    /// Resolved creation properties, in definition order
    #[serde(default)]
    pub properties: Vec<Property>,
    pub created_at: DateTime<Utc>,
}

/// Keyed storage for [`SessionRecord`]s.
///
/// Each operation is atomic with respect to the others on the same store.
pub trait SessionStore: Send + Sync + 'static {
    /// Fetch the record stored under `key`, if any.
    fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>>;

    /// Store `record` under `key`, replacing any previous record.
    fn put(&self, key: &SessionKey, record: SessionRecord) -> Result<()>;

    /// Remove the record stored under `key`. Missing keys are not an error.
    fn delete(&self, key: &SessionKey) -> Result<()>;

    /// Remove the record under `key` only if it points at session `id`.
    ///
    /// Returns `true` if a record was removed.
    fn remove_if_id(&self, key: &SessionKey, id: SessionId) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_format() {
        let key = SessionKey::new("alice", "pyspark");
        assert_eq!(key.as_str(), "alice-pyspark");
        assert_eq!(key.to_string(), "alice-pyspark");
        assert_eq!(key, SessionKey::new("alice", "pyspark"));
    }

    #[test]
    fn record_serializes_kind_as_type() {
        let record = SessionRecord {
            kind: SessionKind::Pyspark,
            id: 3,
            properties: vec![Property::new("driverMemory", "1G")],
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "pyspark");
        assert_eq!(json["id"], 3);

        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}

use dashmap::DashMap;
use livy_client::SessionId;

use super::{SessionKey, SessionRecord, SessionStore};
use crate::error::Result;

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: DashMap<SessionKey, SessionRecord>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    fn put(&self, key: &SessionKey, record: SessionRecord) -> Result<()> {
        self.records.insert(key.clone(), record);
        Ok(())
    }

    fn delete(&self, key: &SessionKey) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }

    fn remove_if_id(&self, key: &SessionKey, id: SessionId) -> Result<bool> {
        Ok(self.records.remove_if(key, |_, r| r.id == id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use livy_client::SessionKind;
    use std::sync::Arc;

    fn record(id: SessionId) -> SessionRecord {
        SessionRecord {
            kind: SessionKind::Scala,
            id,
            properties: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn put_overwrites_previous_record() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::new("alice", "spark");

        store.put(&key, record(1)).unwrap();
        store.put(&key, record(2)).unwrap();

        assert_eq!(store.get(&key).unwrap().map(|r| r.id), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_if_id_checks_the_id() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::new("alice", "spark");
        store.put(&key, record(5)).unwrap();

        assert!(!store.remove_if_id(&key, 6).unwrap());
        assert!(store.get(&key).unwrap().is_some());

        assert!(store.remove_if_id(&key, 5).unwrap());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn delete_missing_key_is_ok() {
        let store = InMemorySessionStore::new();
        store.delete(&SessionKey::new("nobody", "spark")).unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_puts_keep_one_record_per_key() {
        let store = Arc::new(InMemorySessionStore::new());
        let key = SessionKey::new("alice", "spark");

        let mut handles = Vec::new();
        for id in 0..20 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move { store.put(&key, record(id)) }));
        }
        for handle in handles {
            handle.await.expect("Task should complete").unwrap();
        }

        assert_eq!(store.len(), 1);
    }
}

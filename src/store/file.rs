use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use livy_client::SessionId;
use parking_lot::Mutex;

use super::{SessionKey, SessionRecord, SessionStore};
use crate::error::{Result, SparkError};

/// Get the default path of the session affinity file.
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".livy-connector")
        .join("sessions.json")
}

/// Store persisted as one JSON object on disk.
///
/// Every operation reads, modifies and rewrites the file under a single lock,
/// and writes go through a temp file + rename so readers never see a partial
/// file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

type Records = BTreeMap<String, SessionRecord>;

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Records> {
        if !self.path.exists() {
            return Ok(Records::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Records::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            SparkError::Store(format!(
                "Failed to parse session store {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, records: &Records) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| SparkError::Store(format!("Failed to serialize sessions: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &SessionKey) -> Result<Option<SessionRecord>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key.as_str()))
    }

    fn put(&self, key: &SessionKey, record: SessionRecord) -> Result<()> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        records.insert(key.as_str().to_string(), record);
        self.save(&records)
    }

    fn delete(&self, key: &SessionKey) -> Result<()> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        if records.remove(key.as_str()).is_some() {
            self.save(&records)?;
        }
        Ok(())
    }

    fn remove_if_id(&self, key: &SessionKey, id: SessionId) -> Result<bool> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        match records.get(key.as_str()) {
            Some(record) if record.id == id => {
                records.remove(key.as_str());
                self.save(&records)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::Property;
    use chrono::Utc;
    use livy_client::SessionKind;
    use tempfile::TempDir;

    fn record(id: SessionId) -> SessionRecord {
        SessionRecord {
            kind: SessionKind::Pyspark,
            id,
            properties: vec![Property::new("driverMemory", "2G")],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions.json"));
        assert!(store.get(&SessionKey::new("alice", "pyspark")).unwrap().is_none());
    }

    #[test]
    fn records_survive_a_new_store_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.json");
        let key = SessionKey::new("alice", "pyspark");

        FileSessionStore::new(&path).put(&key, record(11)).unwrap();

        let reopened = FileSessionStore::new(&path);
        let stored = reopened.get(&key).unwrap().expect("record should persist");
        assert_eq!(stored.id, 11);
        assert_eq!(stored.properties, vec![Property::new("driverMemory", "2G")]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions.json"));
        let alice = SessionKey::new("alice", "pyspark");
        let bob = SessionKey::new("bob", "pyspark");

        store.put(&alice, record(1)).unwrap();
        store.put(&bob, record(2)).unwrap();
        store.delete(&alice).unwrap();

        assert!(store.get(&alice).unwrap().is_none());
        assert_eq!(store.get(&bob).unwrap().map(|r| r.id), Some(2));
    }

    #[test]
    fn remove_if_id_leaves_newer_record() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions.json"));
        let key = SessionKey::new("alice", "pyspark");
        store.put(&key, record(8)).unwrap();

        assert!(!store.remove_if_id(&key, 7).unwrap());
        assert!(store.remove_if_id(&key, 8).unwrap());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(&path);
        let err = store.get(&SessionKey::new("alice", "pyspark")).unwrap_err();
        assert!(matches!(err, SparkError::Store(_)));
    }
}

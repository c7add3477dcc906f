//! Settings schema for the connector.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::jobs::DeploymentMode;
use crate::properties::Property;
use crate::session::{PollConfig, DEFAULT_MAX_POLL_ATTEMPTS};
use crate::store::default_store_path;

/// Livy URL used when neither settings nor environment provide one
pub const DEFAULT_LIVY_URL: &str = "http://localhost:8998";

/// Livy gives a session create request 90 seconds to complete.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Root settings structure.
///
/// Loaded from `~/.livy-connector/settings.toml` with environment variable interpolation support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Livy server connection
    pub livy: LivySettings,

    /// Session creation and polling
    pub session: SessionSettings,

    /// Where session affinity is remembered
    pub store: StoreSettings,

    /// Advanced/debug settings
    pub advanced: AdvancedSettings,
}

/// Livy server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivySettings {
    /// Livy base URL (supports $ENV_VAR syntax, falls back to LIVY_URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Basic auth user (supports $ENV_VAR syntax, falls back to LIVY_USERNAME)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic auth password (supports $ENV_VAR syntax, falls back to LIVY_PASSWORD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Value of the X-Requested-By header Livy requires for CSRF protection
    pub requested_by: String,

    /// Per-request timeout. Must outlast Livy's 90 second window for
    /// creating a session.
    pub request_timeout_secs: u64,

    /// Where Livy runs Spark drivers; decides how jobs are read from logs
    pub deployment_mode: DeploymentMode,
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Wait between polls of session and statement state
    pub poll_interval_ms: u64,

    /// Polls before giving up on a starting session or running statement
    pub max_poll_attempts: u32,

    /// Seed new sessions with `default_properties` when none are given
    pub use_default_configuration: bool,

    /// Properties used for new sessions when `use_default_configuration` is on
    pub default_properties: Vec<Property>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON file that survives restarts
    #[default]
    File,
    /// Process-local map
    Memory,
}

/// Session affinity store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// Path of the file store (default: ~/.livy-connector/sessions.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Advanced/debug settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub log_level: String,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            version: 1,
            livy: LivySettings::default(),
            session: SessionSettings::default(),
            store: StoreSettings::default(),
            advanced: AdvancedSettings::default(),
        }
    }
}

impl Default for LivySettings {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            requested_by: "livy-connector".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            deployment_mode: DeploymentMode::Local,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            use_default_configuration: false,
            default_properties: Vec::new(),
        }
    }
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl SessionSettings {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    /// Properties new sessions start from when the caller gives none.
    pub fn user_defaults(&self) -> Option<Vec<Property>> {
        (self.use_default_configuration && !self.default_properties.is_empty())
            .then(|| self.default_properties.clone())
    }
}

impl StoreSettings {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_store_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_settings() {
        let settings = ConnectorSettings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.livy.requested_by, "livy-connector");
        assert_eq!(settings.livy.deployment_mode, DeploymentMode::Local);
        assert!(settings.livy.request_timeout_secs > 90);
        assert_eq!(settings.session.poll_config(), PollConfig::default());
        assert_eq!(settings.store.backend, StoreBackend::File);
        assert_eq!(settings.advanced.log_level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            [livy]
            url = "http://livy:8998"
            deployment_mode = "yarn"
        "#;

        let settings: ConnectorSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.livy.url.as_deref(), Some("http://livy:8998"));
        assert_eq!(settings.livy.deployment_mode, DeploymentMode::Yarn);
        // Defaults should fill in missing fields
        assert_eq!(settings.session.max_poll_attempts, 120);
    }

    #[test]
    fn test_default_properties_from_toml() {
        let toml = r#"
            [session]
            use_default_configuration = true

            [[session.default_properties]]
            name = "driverMemory"
            value = "4G"

            [[session.default_properties]]
            name = "jars"
            value = ["hdfs:///lib/a.jar"]
        "#;

        let settings: ConnectorSettings = toml::from_str(toml).unwrap();
        let defaults = settings.session.user_defaults().unwrap();
        assert_eq!(defaults[0], Property::new("driverMemory", "4G"));
        assert_eq!(defaults[1].value, json!(["hdfs:///lib/a.jar"]));
    }

    #[test]
    fn test_user_defaults_need_the_flag() {
        let mut session = SessionSettings::default();
        session.default_properties = vec![Property::new("queue", "etl")];
        assert!(session.user_defaults().is_none());

        session.use_default_configuration = true;
        assert_eq!(session.user_defaults().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_serialize_settings() {
        let settings = ConnectorSettings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("version = 1"));
        assert!(toml_str.contains("[livy]"));
        assert!(toml_str.contains("backend = \"file\""));
    }
}

//! Request and response types for the Livy REST API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Livy assigns integer ids to sessions.
pub type SessionId = u64;

/// Statement ids are unique within a session.
pub type StatementId = u64;

/// Interpreter kind of an interactive session.
///
/// Serialized with Livy's wire names (`spark`, `pyspark`, `sql`, `sparkr`);
/// the notebook-facing spellings are accepted when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[serde(rename = "spark", alias = "scala")]
    Scala,
    #[serde(rename = "pyspark", alias = "python")]
    Pyspark,
    #[serde(rename = "sql", alias = "sparksql")]
    Sql,
    #[serde(rename = "sparkr", alias = "r")]
    R,
}

impl SessionKind {
    /// Livy wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Scala => "spark",
            SessionKind::Pyspark => "pyspark",
            SessionKind::Sql => "sql",
            SessionKind::R => "sparkr",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spark" | "scala" => Ok(SessionKind::Scala),
            "pyspark" | "python" => Ok(SessionKind::Pyspark),
            "sql" | "sparksql" => Ok(SessionKind::Sql),
            "r" | "sparkr" => Ok(SessionKind::R),
            other => Err(format!("Unknown session kind: {}", other)),
        }
    }
}

/// Lifecycle state of an interactive session as reported by Livy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Starting,
    Idle,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
    /// Any state this client does not know about yet
    #[serde(other)]
    Unknown,
}

impl SessionState {
    /// States from which a session can no longer run statements.
    pub const UNUSABLE: [SessionState; 4] = [
        SessionState::Dead,
        SessionState::ShuttingDown,
        SessionState::Error,
        SessionState::Killed,
    ];

    /// Whether a session in this state may still accept work.
    pub fn is_usable(&self) -> bool {
        !Self::UNUSABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not_started",
            SessionState::Starting => "starting",
            SessionState::Idle => "idle",
            SessionState::Busy => "busy",
            SessionState::ShuttingDown => "shutting_down",
            SessionState::Error => "error",
            SessionState::Dead => "dead",
            SessionState::Killed => "killed",
            SessionState::Success => "success",
            SessionState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution state of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementState {
    Waiting,
    Running,
    Available,
    Error,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl StatementState {
    /// Whether the statement is still queued or executing.
    pub fn is_pending(&self) -> bool {
        matches!(self, StatementState::Waiting | StatementState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementState::Waiting => "waiting",
            StatementState::Running => "running",
            StatementState::Available => "available",
            StatementState::Error => "error",
            StatementState::Cancelling => "cancelling",
            StatementState::Cancelled => "cancelled",
            StatementState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for `POST /sessions`.
///
/// Livy's optional creation fields (`driverMemory`, `conf`, `jars`, ...) are
/// carried as a flat JSON object so callers can pass whatever their property
/// table defines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateSession {
    pub kind: SessionKind,
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl CreateSession {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            properties: serde_json::Map::new(),
        }
    }

    /// Set a single creation property, replacing any previous value.
    pub fn with_property(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// Session description returned by `GET /sessions/{id}` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub proxy_user: Option<String>,
    /// Raw kind string; Livy reports `shared` for multi-language sessions
    #[serde(default)]
    pub kind: Option<String>,
    pub state: SessionState,
    #[serde(default)]
    pub log: Vec<String>,
}

/// Response of `GET /sessions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub sessions: Vec<SessionInfo>,
}

/// Response of `GET /sessions/{id}/log`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    #[serde(default)]
    pub id: SessionId,
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub log: Vec<String>,
}

impl SessionLog {
    /// Log lines joined into a single block of text.
    pub fn text(&self) -> String {
        self.log.join("\n")
    }
}

/// Request body for `POST /sessions/{id}/statements`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitStatement {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionKind>,
}

/// A statement as reported by Livy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    #[serde(default)]
    pub code: Option<String>,
    pub state: StatementState,
    #[serde(default)]
    pub output: Option<StatementOutput>,
    #[serde(default)]
    pub progress: Option<f64>,
}

/// Output of a finished statement, tagged by its `status` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatementOutput {
    Ok {
        #[serde(default)]
        execution_count: Option<i64>,
        /// Mime type to content, e.g. `text/plain` or `image/png`
        #[serde(default)]
        data: serde_json::Map<String, serde_json::Value>,
    },
    Error {
        #[serde(default)]
        execution_count: Option<i64>,
        #[serde(default)]
        ename: Option<String>,
        #[serde(default)]
        evalue: Option<String>,
        #[serde(default)]
        traceback: Option<Vec<String>>,
    },
    #[serde(other)]
    Unknown,
}

/// Livy's error body, e.g. `{"msg": "Session '3' not found."}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_kind_wire_names() {
        assert_eq!(serde_json::to_value(SessionKind::Scala).unwrap(), json!("spark"));
        assert_eq!(serde_json::to_value(SessionKind::R).unwrap(), json!("sparkr"));

        let kind: SessionKind = serde_json::from_value(json!("sparksql")).unwrap();
        assert_eq!(kind, SessionKind::Sql);
    }

    #[test]
    fn test_session_kind_from_str() {
        assert_eq!("scala".parse::<SessionKind>(), Ok(SessionKind::Scala));
        assert_eq!("SparkSQL".parse::<SessionKind>(), Ok(SessionKind::Sql));
        assert!("cobol".parse::<SessionKind>().is_err());
    }

    #[test]
    fn test_session_state_usable() {
        assert!(SessionState::Idle.is_usable());
        assert!(SessionState::Busy.is_usable());
        assert!(SessionState::Starting.is_usable());
        for state in SessionState::UNUSABLE {
            assert!(!state.is_usable(), "{} should be unusable", state);
        }
    }

    #[test]
    fn test_unknown_states_deserialize() {
        let state: SessionState = serde_json::from_value(json!("recovering")).unwrap();
        assert_eq!(state, SessionState::Unknown);

        let state: StatementState = serde_json::from_value(json!("queued")).unwrap();
        assert_eq!(state, StatementState::Unknown);
    }

    #[test]
    fn test_create_session_flattens_properties() {
        let request = CreateSession::new(SessionKind::Pyspark)
            .with_property("driverMemory", json!("2G"))
            .with_property("jars", json!([]));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({"kind": "pyspark", "driverMemory": "2G", "jars": []})
        );
    }

    #[test]
    fn test_parse_session_info() {
        let info: SessionInfo = serde_json::from_value(json!({
            "id": 7,
            "appId": "application_1_0001",
            "owner": "alice",
            "proxyUser": null,
            "kind": "shared",
            "state": "idle",
            "log": ["line 1", "line 2"],
            "appInfo": {"driverLogUrl": null}
        }))
        .unwrap();

        assert_eq!(info.id, 7);
        assert_eq!(info.owner.as_deref(), Some("alice"));
        assert_eq!(info.state, SessionState::Idle);
        assert_eq!(info.log.len(), 2);
    }

    #[test]
    fn test_parse_statement_outputs() {
        let ok: Statement = serde_json::from_value(json!({
            "id": 0,
            "state": "available",
            "output": {
                "status": "ok",
                "execution_count": 0,
                "data": {"text/plain": "2"}
            }
        }))
        .unwrap();
        match ok.output {
            Some(StatementOutput::Ok { data, .. }) => {
                assert_eq!(data.get("text/plain"), Some(&json!("2")));
            }
            other => panic!("unexpected output: {:?}", other),
        }

        let err: Statement = serde_json::from_value(json!({
            "id": 1,
            "state": "available",
            "output": {
                "status": "error",
                "ename": "NameError",
                "evalue": "name 'x' is not defined",
                "traceback": []
            }
        }))
        .unwrap();
        assert!(matches!(
            err.output,
            Some(StatementOutput::Error { ename: Some(ref n), .. }) if n == "NameError"
        ));

        let running: Statement =
            serde_json::from_value(json!({"id": 2, "state": "running", "output": null})).unwrap();
        assert!(running.output.is_none());
        assert!(running.state.is_pending());
    }
}

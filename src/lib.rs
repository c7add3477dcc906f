//! Spark notebook connector backed by Apache Livy.
//!
//! Keeps one remote Spark session per user and interpreter alive on a Livy
//! server, runs statements in it and normalizes their results.
//!
//! ```text
//! SparkConnector
//!   +-- SessionLifecycleManager --> SessionStore (affinity hint)
//!   +-- StatementExecutor       --> RemoteSessionService (Livy)
//!   +-- LogJobExtractor
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod connector;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod metrics;
pub mod properties;
pub mod result;
pub mod service;
pub mod session;
pub mod settings;
pub mod store;

pub use connector::{Autocomplete, ExecutionHandle, SparkConnector};
pub use error::{Result, SparkError};
pub use executor::StatementExecutor;
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use result::ResultPayload;
pub use service::RemoteSessionService;
pub use session::{CloseOutcome, PollConfig, Session, SessionLifecycleManager};

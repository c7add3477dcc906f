//! CLI bootstrap - Wire settings, the Livy client and the connector together.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use livy_client::{Client, SessionKind};

use crate::connector::SparkConnector;
use crate::executor::StatementExecutor;
use crate::metrics::SessionMetrics;
use crate::properties::Property;
use crate::service::RemoteSessionService;
use crate::session::{Session, SessionLifecycleManager};
use crate::settings::{self, livy_url, setting_or_env, ConnectorSettings, StoreBackend};
use crate::store::{FileSessionStore, InMemorySessionStore, SessionStore};

use super::args::Args;

/// Context for CLI execution containing all initialized services.
pub struct CliContext {
    /// Connector for the current user and interpreter
    pub connector: SparkConnector,

    /// Session used by the previous statement, if any
    pub session: Option<Session>,

    /// Properties for sessions created by this run
    pub properties: Option<Vec<Property>>,

    /// Lifecycle counters
    pub metrics: Arc<SessionMetrics>,

    /// Command-line arguments
    pub args: Args,
}

impl CliContext {
    /// Graceful shutdown - report what happened during the run.
    pub async fn shutdown(self) -> Result<()> {
        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            "Sessions created: {}, reused: {}, closed: {}, reaped: {}, statements: {}",
            snapshot.sessions_created,
            snapshot.sessions_reused,
            snapshot.sessions_closed,
            snapshot.sessions_reaped,
            snapshot.statements_submitted
        );
        Ok(())
    }
}

/// Initialize the CLI context with all services.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    let settings_path = settings::settings_path();
    let settings = settings::load(&settings_path)
        .await
        .context("Failed to load settings")?;

    // Initialize logging based on verbosity
    let log_level = if args.verbose {
        "debug"
    } else {
        settings.advanced.log_level.as_str()
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("livy_connector={}", log_level).parse()?)
                .add_directive(format!("livy_client={}", log_level).parse()?),
        )
        .try_init();

    if args.verbose {
        eprintln!("[cli] Settings loaded from {}", settings_path.display());
    }

    let owner = resolve_user(&settings, args)?;
    let kind = args.resolve_kind()?;
    let properties = args.properties()?;

    let client = build_client(&settings, args)?;
    if args.verbose {
        eprintln!("[cli] Livy: {}", client.base_url());
        eprintln!("[cli] User: {}", owner);
        eprintln!("[cli] Interpreter: {} ({})", args.interpreter, kind);
    }

    let metrics = Arc::new(SessionMetrics::new());
    let connector = build_connector(
        &settings,
        Arc::new(client),
        owner,
        &args.interpreter,
        kind,
        metrics.clone(),
    );

    Ok(CliContext {
        connector,
        session: None,
        properties,
        metrics,
        args: args.clone(),
    })
}

/// Assemble a connector for one user on top of any session service.
pub fn build_connector(
    settings: &ConnectorSettings,
    service: Arc<dyn RemoteSessionService>,
    owner: String,
    interpreter: &str,
    kind: SessionKind,
    metrics: Arc<SessionMetrics>,
) -> SparkConnector {
    let poll = settings.session.poll_config();

    let mut sessions =
        SessionLifecycleManager::new(service.clone(), build_store(settings), metrics.clone())
            .with_poll_config(poll);
    if let Some(defaults) = settings.session.user_defaults() {
        sessions = sessions.with_user_defaults(defaults);
    }

    let executor = StatementExecutor::new(service, metrics).with_poll_config(poll);

    SparkConnector::new(
        owner,
        interpreter,
        kind,
        Arc::new(sessions),
        Arc::new(executor),
    )
    .with_deployment_mode(settings.livy.deployment_mode)
}

fn build_store(settings: &ConnectorSettings) -> Arc<dyn SessionStore> {
    match settings.store.backend {
        StoreBackend::File => Arc::new(FileSessionStore::new(settings.store.resolved_path())),
        StoreBackend::Memory => Arc::new(InMemorySessionStore::new()),
    }
}

/// Build the Livy client from CLI args, settings, or environment variables.
fn build_client(settings: &ConnectorSettings, args: &Args) -> Result<Client> {
    let url = args.url.clone().unwrap_or_else(|| livy_url(settings));

    let mut client = Client::new(&url)
        .with_context(|| format!("Invalid Livy URL: {}", url))?
        .with_request_timeout(Duration::from_secs(settings.livy.request_timeout_secs))?
        .with_requested_by(settings.livy.requested_by.clone());

    if let Some(username) = setting_or_env(settings.livy.username.as_deref(), &["LIVY_USERNAME"]) {
        let password = setting_or_env(settings.livy.password.as_deref(), &["LIVY_PASSWORD"]);
        client = client.with_basic_auth(username, password);
    }

    Ok(client)
}

/// Resolve the session owner from CLI args, settings, or the login name.
fn resolve_user(settings: &ConnectorSettings, args: &Args) -> Result<String> {
    if let Some(ref user) = args.user {
        return Ok(user.clone());
    }

    setting_or_env(
        settings.livy.username.as_deref(),
        &["LIVY_USERNAME", "USER", "USERNAME"],
    )
    .ok_or_else(|| {
        anyhow::anyhow!(
            "No user found. Set livy.username in ~/.livy-connector/settings.toml, \
             LIVY_USERNAME, or use --user"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_resolve_user_from_args() {
        let settings = ConnectorSettings::default();
        let args = Args::parse_from(["livy-cli", "--user", "alice"]);

        assert_eq!(resolve_user(&settings, &args).unwrap(), "alice");
    }

    #[test]
    fn test_resolve_user_from_settings() {
        let mut settings = ConnectorSettings::default();
        settings.livy.username = Some("bob".to_string());
        let args = Args::parse_from(["livy-cli"]);

        assert_eq!(resolve_user(&settings, &args).unwrap(), "bob");
    }

    #[test]
    fn test_build_client_prefers_args_url() {
        let mut settings = ConnectorSettings::default();
        settings.livy.url = Some("http://from-settings:8998".to_string());
        let args = Args::parse_from(["livy-cli", "--url", "http://from-args:8998"]);

        let client = build_client(&settings, &args).unwrap();
        assert_eq!(client.base_url().as_str(), "http://from-args:8998/");
    }

    #[test]
    fn test_build_client_rejects_bad_url() {
        let settings = ConnectorSettings::default();
        let args = Args::parse_from(["livy-cli", "--url", "not a url"]);

        assert!(build_client(&settings, &args).is_err());
    }
}

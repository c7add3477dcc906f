//! Reading `settings.toml`.
//!
//! `$VAR` and `${VAR}` references inside string values are expanded from the
//! environment when the file is read. A commented template is written the
//! first time the connector runs.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::schema::{ConnectorSettings, DEFAULT_LIVY_URL};

const TEMPLATE: &str = include_str!("template.toml");

static ENV_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex")
});

/// `~/.livy-connector/settings.toml`
pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".livy-connector")
        .join("settings.toml")
}

/// Load settings from `path`, generating the template there if it is missing.
///
/// When the template cannot be written the defaults are used.
pub async fn load(path: &Path) -> Result<ConnectorSettings> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = write_template(path).await {
            tracing::warn!(
                "Could not write settings template to {}: {:#}",
                path.display(),
                e
            );
            return Ok(ConnectorSettings::default());
        }
        tracing::info!("Generated settings template at {}", path.display());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut settings: ConnectorSettings = toml::from_str(&contents)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    expand_env_refs(&mut settings);

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

async fn write_template(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, TEMPLATE).await?;
    Ok(())
}

fn expand_env_refs(settings: &mut ConnectorSettings) {
    let livy = &mut settings.livy;
    let optional = [
        &mut livy.url,
        &mut livy.username,
        &mut livy.password,
        &mut settings.store.path,
    ];
    for value in optional.into_iter().flatten() {
        *value = expand_env(value);
    }
    livy.requested_by = expand_env(&livy.requested_by);
}

/// Replace `$VAR` and `${VAR}` with the variable's value.
///
/// References to unset variables are left as written.
fn expand_env(value: &str) -> String {
    ENV_REF_RE
        .replace_all(value, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// A non-empty `setting`, else the first non-empty variable among `env_vars`.
pub fn setting_or_env(setting: Option<&str>, env_vars: &[&str]) -> Option<String> {
    setting
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env_vars
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|value| !value.is_empty())
        })
}

/// Livy URL from settings, then `LIVY_URL`, then the local default.
pub fn livy_url(settings: &ConnectorSettings) -> String {
    setting_or_env(settings.livy.url.as_deref(), &["LIVY_URL"])
        .unwrap_or_else(|| DEFAULT_LIVY_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::DeploymentMode;
    use tempfile::TempDir;

    mod expand_tests {
        use super::*;

        #[test]
        fn expands_bare_and_braced_references() {
            std::env::set_var("LIVY_LOADER_HOST", "livy.internal");

            assert_eq!(expand_env("$LIVY_LOADER_HOST"), "livy.internal");
            assert_eq!(
                expand_env("http://${LIVY_LOADER_HOST}:8998"),
                "http://livy.internal:8998"
            );

            std::env::remove_var("LIVY_LOADER_HOST");
        }

        #[test]
        fn leaves_unset_references_alone() {
            assert_eq!(expand_env("$LIVY_LOADER_UNSET_XYZ"), "$LIVY_LOADER_UNSET_XYZ");
            assert_eq!(expand_env("plain"), "plain");
            assert_eq!(expand_env("cost: $5"), "cost: $5");
        }
    }

    mod fallback_tests {
        use super::*;

        #[test]
        fn setting_wins() {
            assert_eq!(
                setting_or_env(Some("from-settings"), &["PATH"]),
                Some("from-settings".to_string())
            );
        }

        #[test]
        fn empty_setting_falls_through_to_env() {
            std::env::set_var("LIVY_LOADER_FALLBACK", "from-env");

            assert_eq!(
                setting_or_env(Some(""), &["LIVY_LOADER_MISSING_ABC", "LIVY_LOADER_FALLBACK"]),
                Some("from-env".to_string())
            );

            std::env::remove_var("LIVY_LOADER_FALLBACK");
        }

        #[test]
        fn nothing_set() {
            assert_eq!(setting_or_env(None, &["LIVY_LOADER_MISSING_DEF"]), None);
        }

        #[test]
        fn livy_url_prefers_settings() {
            let mut settings = ConnectorSettings::default();
            settings.livy.url = Some("http://livy.internal:8998".to_string());
            assert_eq!(livy_url(&settings), "http://livy.internal:8998");
        }
    }

    mod load_tests {
        use super::*;

        #[tokio::test]
        async fn first_run_writes_a_parseable_template() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("nested").join("settings.toml");

            let settings = load(&path).await.unwrap();
            assert!(path.exists());
            assert_eq!(settings.version, 1);
            assert_eq!(settings.livy.requested_by, "livy-connector");
            assert_eq!(settings.session.max_poll_attempts, 120);

            // Second load reads the generated file untouched
            let again = load(&path).await.unwrap();
            assert_eq!(again.livy.request_timeout_secs, settings.livy.request_timeout_secs);
        }

        #[tokio::test]
        async fn reads_existing_file_with_env_refs() {
            std::env::set_var("LIVY_LOADER_PASSWORD", "s3cret");
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("settings.toml");
            std::fs::write(
                &path,
                "[livy]\npassword = \"${LIVY_LOADER_PASSWORD}\"\ndeployment_mode = \"yarn\"\n",
            )
            .unwrap();

            let settings = load(&path).await.unwrap();
            assert_eq!(settings.livy.password.as_deref(), Some("s3cret"));
            assert_eq!(settings.livy.deployment_mode, DeploymentMode::Yarn);

            std::env::remove_var("LIVY_LOADER_PASSWORD");
        }

        #[tokio::test]
        async fn unwritable_location_uses_defaults() {
            let dir = TempDir::new().unwrap();
            let blocker = dir.path().join("not-a-dir");
            std::fs::write(&blocker, "").unwrap();

            let settings = load(&blocker.join("settings.toml")).await.unwrap();
            assert_eq!(settings.livy.url, None);
        }

        #[tokio::test]
        async fn invalid_toml_is_an_error() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("settings.toml");
            std::fs::write(&path, "[livy\n").unwrap();

            assert!(load(&path).await.is_err());
        }
    }
}

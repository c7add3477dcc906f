//! TOML-based settings for the connector.
//!
//! Settings live in `~/.livy-connector/settings.toml`. `LIVY_URL`,
//! `LIVY_USERNAME` and `LIVY_PASSWORD` fill in values the file leaves empty.
//!
//! # Usage
//!
//! ```rust,ignore
//! use livy_connector::settings::{self, setting_or_env};
//!
//! let settings = settings::load(&settings::settings_path()).await?;
//! let password = setting_or_env(settings.livy.password.as_deref(), &["LIVY_PASSWORD"]);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{livy_url, load, setting_or_env, settings_path};
pub use schema::{ConnectorSettings, StoreBackend};

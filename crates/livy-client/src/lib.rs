//! Typed client for the Apache Livy interactive sessions REST API.
//!
//! This crate wraps the handful of Livy endpoints a notebook backend needs:
//! session creation, inspection, listing and deletion, statement submission
//! and polling, statement cancellation, and session log paging.
//!
//! # Example
//!
//! ```rust,no_run
//! use livy_client::{Client, CreateSession, SessionKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("http://localhost:8998")?
//!     .with_requested_by("livy-connector");
//!
//! let session = client
//!     .create_session(&CreateSession::new(SessionKind::Pyspark))
//!     .await?;
//! let statement = client.submit_statement(session.id, "1 + 1").await?;
//! println!("statement {} is {}", statement.id, statement.state);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::Client;
pub use error::LivyError;
pub use types::*;

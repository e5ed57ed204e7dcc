//! # session-keeper
//!
//! In-process, server-side HTTP session store.
//!
//! Each inbound request carries an opaque session identifier, either in a
//! URL query parameter or in a cookie. The [`SessionManager`] resolves that
//! identifier to a [`Session`] (a mutable bag of per-visitor values),
//! creating a fresh session when the identifier is missing, malformed or
//! stale. A background [`Reaper`] evicts sessions that have been idle for
//! longer than the configured lifetime.
//!
//! Sessions live only in memory: nothing is persisted or replicated.
//!
//! ## Quick Start
//!
//! ```no_run
//! use axum::http::{HeaderMap, Request};
//! use session_keeper::{ManagerConfig, SessionManager, TransportMode};
//!
//! #[tokio::main]
//! async fn main() -> session_keeper::Result<()> {
//!     session_keeper::logging::try_init().ok();
//!
//!     let config = ManagerConfig::new("SESSIONID", 1800).with_transport(TransportMode::Cookie);
//!     let manager = SessionManager::new(config)?;
//!     let reaper = manager.spawn_reaper();
//!
//!     let request = Request::builder().uri("/").body(()).unwrap();
//!     let mut response_headers = HeaderMap::new();
//!     let session = manager.start(&request, &mut response_headers);
//!     session.set("user", "alice");
//!
//!     println!("session {} started", session.id());
//!     reaper.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

// Re-export commonly used types
pub use error::{Result, SessionError};
pub use session::{
    ManagerConfig, Reaper, Session, SessionId, SessionManager, SessionRequest, SessionResponse,
    SessionStore, TransportMode, Value,
};

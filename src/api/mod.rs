//! Demo HTTP layer for session-keeper.
//!
//! A small axum application that keeps its state in visitor sessions. It
//! exists to exercise the session manager end to end; the session core has
//! no dependency on it.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /` - Count visits in the current session
//! - `GET /values` - List keys in the current session
//! - `GET /values/{key}` - Read a value
//! - `PUT /values/{key}` - Store a JSON value
//! - `DELETE /values/{key}` - Remove a value
//! - `POST /logout` - Destroy the current session
//!
//! ## Example
//!
//! ```no_run
//! use session_keeper::api::{serve, AppState, ServerConfig};
//! use session_keeper::ManagerConfig;
//!
//! #[tokio::main]
//! async fn main() -> session_keeper::Result<()> {
//!     let state = AppState::from_config(ManagerConfig::new("SESSIONID", 1800))?;
//!     serve(ServerConfig::new("127.0.0.1", 3000), state).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::{AppState, CurrentSession};
pub use router::{create_router, serve, ServerConfig};
pub use types::{ErrorResponse, KeysResponse, ValueResponse, VisitResponse};

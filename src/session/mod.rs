//! Session management module.
//!
//! This module provides the in-memory session store and everything around
//! it: identifiers, the per-visitor session handle, identifier transports
//! (query parameter or cookie), the manager that ties them together, and
//! the background reaper that evicts idle sessions.

mod handle;
mod id;
mod manager;
mod reaper;
mod store;
pub mod transport;
mod value;

pub use handle::Session;
pub use id::SessionId;
pub use manager::{ManagerConfig, SessionManager};
pub use reaper::{Reaper, MAX_SWEEP_INTERVAL};
pub use store::SessionStore;
pub use transport::{FormRequest, SessionRequest, SessionResponse, TransportMode};
pub use value::Value;

//! Session storage.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::{Session, SessionId};

/// Thread-safe storage for sessions.
///
/// Every operation runs under one exclusive lock over the whole map.
/// `sweep` inspects each session's timestamp while the map lock is held,
/// so a payload access either completes before the sweep inspects that
/// session or starts after it. `sweep` never blocks on a session lock: a
/// session whose lock is held is in use and is kept. Session handles never
/// take the map lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionStore {
    /// Create a new empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty session under `id`.
    ///
    /// Replaces any session previously registered under the same id; callers
    /// only pass freshly generated ids.
    pub fn init(&self, id: SessionId) -> Session {
        let session = Session::new(id.clone());
        self.sessions.lock().insert(id, session.clone());
        session
    }

    /// Look up a live session.
    pub fn read(&self, id: &SessionId) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    /// Un-register a session. Handles already given out stay usable.
    ///
    /// Returns the removed session, or `None` if it wasn't registered.
    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions.lock().remove(id)
    }

    /// Remove every session idle for longer than `max_lifetime`.
    ///
    /// Returns the number of sessions removed.
    pub fn sweep(&self, max_lifetime: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session
                .try_idle_at(now)
                .map_or(true, |idle| idle <= max_lifetime);
            if !keep {
                tracing::debug!(session_id = %id, "session expired");
            }
            keep
        });
        before - sessions.len()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// List all live session IDs.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.lock().keys().cloned().collect()
    }
}

//! The per-visitor session handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::{SessionId, Value};

#[derive(Debug)]
struct SessionData {
    created_at: Instant,
    last_accessed: Instant,
    values: HashMap<String, Value>,
}

impl SessionData {
    /// Refresh the access time. Never moves backwards.
    fn touch(&mut self) {
        let now = Instant::now();
        if now > self.last_accessed {
            self.last_accessed = now;
        }
    }
}

/// A visitor session.
///
/// Cloning yields another handle to the same session. The store and any
/// request holding a handle share ownership: removing a session from the
/// store un-registers it, but handles already given out keep working until
/// they are dropped.
///
/// Every payload access (`get`, `set`, `delete`, `contains`, `keys`, `len`)
/// refreshes the last-access time.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    data: Arc<Mutex<SessionData>>,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            data: Arc::new(Mutex::new(SessionData {
                created_at: now,
                last_accessed: now,
                values: HashMap::new(),
            })),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut data = self.data.lock();
        data.touch();
        data.values.insert(key.into(), value.into());
    }

    /// Look up `key`. `None` means the key was never set (or was deleted);
    /// a stored null comes back as `Some(Value::Null)`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut data = self.data.lock();
        data.touch();
        data.values.get(key).cloned()
    }

    /// Remove `key`, returning the value it held.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let mut data = self.data.lock();
        data.touch();
        data.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        let mut data = self.data.lock();
        data.touch();
        data.values.contains_key(key)
    }

    /// Keys currently stored, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let mut data = self.data.lock();
        data.touch();
        data.values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let mut data = self.data.lock();
        data.touch();
        data.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the payload under a single lock acquisition.
    ///
    /// Useful for read-modify-write sequences such as counters that must
    /// not interleave with another request on the same session.
    ///
    /// The session lock is held while `f` runs, so `f` must not call back
    /// into this session through any handle (`get`, `set`, another
    /// `update`, ...); the lock is not reentrant and that call blocks
    /// forever. Store and manager calls from `f` are fine.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<String, Value>) -> R,
    {
        let mut data = self.data.lock();
        data.touch();
        f(&mut data.values)
    }

    pub fn created_at(&self) -> Instant {
        self.data.lock().created_at
    }

    pub fn last_accessed(&self) -> Instant {
        self.data.lock().last_accessed
    }

    /// Time since the last payload access.
    pub fn idle_duration(&self) -> Duration {
        self.idle_at(Instant::now())
    }

    pub(crate) fn idle_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.data.lock().last_accessed)
    }

    /// Idle time, or `None` while another caller holds the session lock.
    /// A locked session is mid-access and therefore not idle.
    pub(crate) fn try_idle_at(&self, now: Instant) -> Option<Duration> {
        self.data
            .try_lock()
            .map(|data| now.saturating_duration_since(data.last_accessed))
    }

    /// Refresh the last-access time without touching the payload.
    pub(crate) fn touch(&self) {
        self.data.lock().touch();
    }

    /// Whether both handles refer to the same underlying session.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

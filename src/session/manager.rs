//! Session manager: ties the store to a transport.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::transport::{
    CookieTransport, IdTransport, QueryTransport, SessionRequest, SessionResponse, TransportMode,
};
use super::{Reaper, Session, SessionId, SessionStore, MAX_SWEEP_INTERVAL};
use crate::error::SessionError;
use crate::Result;

/// Characters allowed in a cookie name (RFC 6265 token).
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Manager configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Cookie or query parameter name carrying the identifier.
    pub identifier_name: String,
    /// Idle time after which a session is evicted.
    pub max_lifetime_secs: i64,
    /// Initial transport mode.
    pub transport: TransportMode,
    /// Reaper cadence. Defaults to a quarter of the lifetime, at least 1s
    /// and at most [`MAX_SWEEP_INTERVAL`].
    pub sweep_interval: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            identifier_name: "SESSIONID".to_string(),
            max_lifetime_secs: 1800,
            transport: TransportMode::default(),
            sweep_interval: None,
        }
    }
}

impl ManagerConfig {
    pub fn new(identifier_name: impl Into<String>, max_lifetime_secs: i64) -> Self {
        Self {
            identifier_name: identifier_name.into(),
            max_lifetime_secs,
            ..Default::default()
        }
    }

    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Eviction threshold. Zero for a non-positive (invalid) lifetime.
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.max_lifetime_secs).unwrap_or(0))
    }

    /// Effective reaper cadence.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
            .unwrap_or_else(|| (self.max_lifetime() / 4).max(Duration::from_secs(1)))
            .min(MAX_SWEEP_INTERVAL)
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.identifier_name.is_empty() {
            return Err(SessionError::InvalidConfig(
                "identifier name must not be empty".into(),
            ));
        }
        if !self.identifier_name.chars().all(is_token_char) {
            return Err(SessionError::InvalidConfig(format!(
                "identifier name contains invalid characters: {:?}",
                self.identifier_name
            )));
        }
        if self.max_lifetime_secs <= 0 {
            return Err(SessionError::InvalidConfig(format!(
                "max lifetime must be positive, got {}",
                self.max_lifetime_secs
            )));
        }
        if let Some(interval) = self.sweep_interval {
            if interval.is_zero() {
                return Err(SessionError::InvalidConfig(
                    "sweep interval must be non-zero".into(),
                ));
            }
            if interval > MAX_SWEEP_INTERVAL {
                return Err(SessionError::InvalidConfig(format!(
                    "sweep interval must be at most {}s, got {}s",
                    MAX_SWEEP_INTERVAL.as_secs(),
                    interval.as_secs()
                )));
            }
        }
        Ok(())
    }
}

/// Starts, resolves and destroys sessions for incoming requests.
///
/// The manager owns its [`SessionStore`]; applications reach sessions only
/// through [`start`](Self::start) and [`destroy`](Self::destroy). A bad or
/// stale identifier never fails a request: `start` answers it with a fresh
/// session and `destroy` ignores it.
pub struct SessionManager {
    config: ManagerConfig,
    store: Arc<SessionStore>,
    mode: RwLock<TransportMode>,
    query: QueryTransport,
    cookie: CookieTransport,
}

impl SessionManager {
    /// Create a manager with an empty store.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        config.validate()?;

        let max_age = config.max_lifetime().as_secs();
        let manager = Self {
            query: QueryTransport::new(&config.identifier_name),
            cookie: CookieTransport::new(&config.identifier_name, max_age),
            mode: RwLock::new(config.transport),
            store: Arc::new(SessionStore::new()),
            config,
        };

        info!(
            identifier = %manager.config.identifier_name,
            max_lifetime_secs = manager.config.max_lifetime_secs,
            transport = %manager.config.transport,
            "session manager initialized"
        );
        Ok(manager)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn transport_mode(&self) -> TransportMode {
        *self.mode.read()
    }

    /// Switch transports. Only affects later `start`/`destroy` calls.
    pub fn set_transport_mode(&self, mode: TransportMode) {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "session transport changed");
        }
    }

    fn transport(&self) -> &dyn IdTransport {
        match self.transport_mode() {
            TransportMode::QueryParameter => &self.query,
            TransportMode::Cookie => &self.cookie,
        }
    }

    /// Return the session the request refers to, creating one if needed.
    ///
    /// Resuming a session counts as an access and refreshes its timestamp.
    /// A new session's identifier is pushed back through the transport
    /// (a `Set-Cookie` header in cookie mode, nothing in query mode).
    pub fn start(
        &self,
        request: &dyn SessionRequest,
        response: &mut dyn SessionResponse,
    ) -> Session {
        let transport = self.transport();

        if let Some(candidate) = transport.extract(request) {
            if let Some(session) = SessionId::parse(&candidate).and_then(|id| self.store.read(&id))
            {
                session.touch();
                return session;
            }
            debug!("presented session id is unknown or expired");
        }

        let id = SessionId::generate();
        let session = self.store.init(id.clone());
        transport.emit(response, &id);
        debug!(session_id = %id, "session created");
        session
    }

    /// Remove the session the request refers to.
    ///
    /// Returns whether a live session was removed. In cookie mode the client
    /// is also told to drop its cookie whenever it presented one.
    pub fn destroy(
        &self,
        request: &dyn SessionRequest,
        response: &mut dyn SessionResponse,
    ) -> bool {
        let transport = self.transport();

        let Some(candidate) = transport.extract(request) else {
            return false;
        };

        let removed = SessionId::parse(&candidate).and_then(|id| self.store.remove(&id));
        transport.revoke(response);

        match removed {
            Some(session) => {
                debug!(session_id = %session.id(), "session destroyed");
                true
            }
            None => false,
        }
    }

    /// Look up a live session by id without creating one.
    pub fn lookup(&self, id: &SessionId) -> Option<Session> {
        self.store.read(id)
    }

    /// Run one eviction pass now.
    pub fn sweep(&self) -> usize {
        self.store.sweep(self.config.max_lifetime())
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Start the background reaper on the current tokio runtime.
    pub fn spawn_reaper(&self) -> Reaper {
        Reaper::spawn(
            Arc::clone(&self.store),
            self.config.max_lifetime(),
            self.config.sweep_interval(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FormRequest;
    use axum::http::{header, HeaderMap, Request};

    fn manager(mode: TransportMode) -> SessionManager {
        SessionManager::new(ManagerConfig::new("SID", 60).with_transport(mode)).unwrap()
    }

    fn bare() -> Request<()> {
        Request::builder().uri("/").body(()).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.identifier_name, "SESSIONID");
        assert_eq!(config.transport, TransportMode::Cookie);
        assert_eq!(config.max_lifetime(), Duration::from_secs(1800));
        assert_eq!(config.sweep_interval(), Duration::from_secs(450));
    }

    #[test]
    fn test_sweep_interval_floor() {
        let config = ManagerConfig::new("SID", 2);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));

        let config = config.with_sweep_interval(Duration::from_millis(250));
        assert_eq!(config.sweep_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_sweep_interval_ceiling() {
        let config = ManagerConfig::new("SID", i64::MAX);
        assert!(config.validate().is_ok());
        assert_eq!(config.sweep_interval(), MAX_SWEEP_INTERVAL);
    }

    #[test]
    fn test_invalid_configs() {
        for config in [
            ManagerConfig::new("", 60),
            ManagerConfig::new("bad name", 60),
            ManagerConfig::new("SID;", 60),
            ManagerConfig::new("SID", 0),
            ManagerConfig::new("SID", -5),
            ManagerConfig::new("SID", 60).with_sweep_interval(Duration::ZERO),
            ManagerConfig::new("SID", 60).with_sweep_interval(Duration::from_secs(u64::MAX)),
            ManagerConfig::new("SID", 60)
                .with_sweep_interval(MAX_SWEEP_INTERVAL + Duration::from_secs(1)),
        ] {
            assert!(matches!(
                SessionManager::new(config),
                Err(SessionError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_start_without_id_creates_session() {
        let manager = manager(TransportMode::Cookie);
        let mut headers = HeaderMap::new();

        let session = manager.start(&bare(), &mut headers);
        assert_eq!(manager.session_count(), 1);
        assert!(manager.lookup(session.id()).is_some());
        assert!(headers.contains_key(header::SET_COOKIE));
    }

    #[test]
    fn test_start_query_mode_sets_nothing() {
        let manager = manager(TransportMode::QueryParameter);
        let mut headers = HeaderMap::new();

        manager.start(&bare(), &mut headers);
        assert!(headers.is_empty());
        assert_eq!(manager.session_count(), 1);
    }

    #[test]
    fn test_start_resumes_query_session() {
        let manager = manager(TransportMode::QueryParameter);
        let first = manager.start(&bare(), &mut HeaderMap::new());

        let req = Request::builder()
            .uri(format!("/next?SID={}", first.id()))
            .body(())
            .unwrap();
        let mut headers = HeaderMap::new();
        let second = manager.start(&req, &mut headers);

        assert_eq!(first.id(), second.id());
        assert!(headers.is_empty());
        assert_eq!(manager.session_count(), 1);
    }

    #[test]
    fn test_start_replaces_unknown_id() {
        let manager = manager(TransportMode::Cookie);
        let stale = SessionId::generate();
        let req = Request::builder()
            .header(header::COOKIE, format!("SID={}", stale))
            .body(())
            .unwrap();

        let mut headers = HeaderMap::new();
        let session = manager.start(&req, &mut headers);
        assert_ne!(session.id(), &stale);
        assert!(headers.contains_key(header::SET_COOKIE));
    }

    #[test]
    fn test_start_replaces_garbage_id() {
        let manager = manager(TransportMode::QueryParameter);
        for uri in ["/?SID=%zz", "/?SID=not-a-uuid", "/?SID="] {
            let req = Request::builder().uri(uri).body(()).unwrap();
            manager.start(&req, &mut HeaderMap::new());
        }
        assert_eq!(manager.session_count(), 3);
    }

    #[test]
    fn test_destroy_without_id_is_noop() {
        let manager = manager(TransportMode::Cookie);
        manager.start(&bare(), &mut HeaderMap::new());

        let mut headers = HeaderMap::new();
        assert!(!manager.destroy(&bare(), &mut headers));
        assert!(headers.is_empty());
        assert_eq!(manager.session_count(), 1);
    }

    #[test]
    fn test_destroy_unknown_id_is_noop() {
        let manager = manager(TransportMode::QueryParameter);
        manager.start(&bare(), &mut HeaderMap::new());

        let req = Request::builder()
            .uri(format!("/?SID={}", SessionId::generate()))
            .body(())
            .unwrap();
        assert!(!manager.destroy(&req, &mut HeaderMap::new()));
        assert_eq!(manager.session_count(), 1);
    }

    #[test]
    fn test_switch_transport_mode() {
        let manager = manager(TransportMode::Cookie);
        let session = manager.start(&bare(), &mut HeaderMap::new());

        manager.set_transport_mode(TransportMode::QueryParameter);
        assert_eq!(manager.transport_mode(), TransportMode::QueryParameter);

        // The cookie is no longer consulted.
        let req = Request::builder()
            .header(header::COOKIE, format!("SID={}", session.id()))
            .body(())
            .unwrap();
        let other = manager.start(&req, &mut HeaderMap::new());
        assert_ne!(other.id(), session.id());
    }

    #[test]
    fn test_start_reads_form_body_in_query_mode() {
        let manager = manager(TransportMode::QueryParameter);
        let first = manager.start(&bare(), &mut HeaderMap::new());

        let (parts, ()) = Request::builder()
            .method("POST")
            .uri("/submit")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(())
            .unwrap()
            .into_parts();
        let body = format!("SID={}", first.id());
        let second = manager.start(&FormRequest::new(&parts, body.as_bytes()), &mut HeaderMap::new());
        assert_eq!(first.id(), second.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_refreshes_timestamp() {
        let manager = manager(TransportMode::QueryParameter);
        let first = manager.start(&bare(), &mut HeaderMap::new());

        tokio::time::advance(Duration::from_secs(59)).await;
        let req = Request::builder()
            .uri(format!("/?SID={}", first.id()))
            .body(())
            .unwrap();
        let resumed = manager.start(&req, &mut HeaderMap::new());
        assert_eq!(resumed.idle_duration(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(manager.sweep(), 0);
        assert!(manager.lookup(first.id()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_sweep_uses_lifetime() {
        let manager = manager(TransportMode::Cookie);
        manager.start(&bare(), &mut HeaderMap::new());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(manager.sweep(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(manager.sweep(), 1);
        assert_eq!(manager.session_count(), 0);
    }
}

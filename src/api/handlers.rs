//! REST API handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::types::{ErrorResponse, KeysResponse, ValueResponse, VisitResponse};
use crate::session::{FormRequest, ManagerConfig, Session, SessionManager, Value};

const VISITS_KEY: &str = "visits";

/// Largest logout body read when looking for a form-posted identifier.
const FORM_BODY_LIMIT: usize = 16 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
}

impl AppState {
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    /// State around a manager built from `config`.
    pub fn from_config(config: ManagerConfig) -> crate::Result<Self> {
        SessionManager::new(config).map(Self::new)
    }
}

/// The visitor's session, started (or resumed) before the handler runs.
///
/// `headers` holds the `Set-Cookie` header for a newly created session and
/// must be returned with the response.
pub struct CurrentSession {
    pub session: Session,
    pub headers: HeaderMap,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut headers = HeaderMap::new();
        let session = state.manager.start(&*parts, &mut headers);
        Ok(Self { session, headers })
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Count visits in the current session.
pub async fn visit(current: CurrentSession) -> (HeaderMap, Json<VisitResponse>) {
    let visits = current.session.update(|values| {
        let next = values
            .get(VISITS_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;
        values.insert(VISITS_KEY.to_string(), Value::Int(next));
        next
    });

    let body = VisitResponse {
        session_id: current.session.id().to_string(),
        visits,
    };
    (current.headers, Json(body))
}

/// List the keys stored in the current session.
pub async fn list_keys(current: CurrentSession) -> (HeaderMap, Json<KeysResponse>) {
    let mut keys = current.session.keys();
    keys.sort();

    let body = KeysResponse {
        session_id: current.session.id().to_string(),
        keys,
    };
    (current.headers, Json(body))
}

/// Read one value from the current session.
pub async fn get_value(Path(key): Path<String>, current: CurrentSession) -> Response {
    match current.session.get(&key) {
        Some(value) => (current.headers, Json(ValueResponse { key, value })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            current.headers,
            Json(ErrorResponse::key_not_found(&key)),
        )
            .into_response(),
    }
}

/// Store a value in the current session.
pub async fn put_value(
    Path(key): Path<String>,
    current: CurrentSession,
    Json(value): Json<Value>,
) -> (StatusCode, HeaderMap) {
    current.session.set(key, value);
    (StatusCode::NO_CONTENT, current.headers)
}

/// Remove a value from the current session.
pub async fn delete_value(Path(key): Path<String>, current: CurrentSession) -> (StatusCode, HeaderMap) {
    current.session.delete(&key);
    (StatusCode::NO_CONTENT, current.headers)
}

/// Destroy the current session.
///
/// In query mode the identifier may also arrive in an urlencoded form body.
/// An unreadable or oversized body is ignored.
pub async fn logout(State(state): State<AppState>, request: Request) -> (StatusCode, HeaderMap) {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, FORM_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring logout body");
            Default::default()
        }
    };

    let mut headers = HeaderMap::new();
    state
        .manager
        .destroy(&FormRequest::new(&parts, &bytes), &mut headers);
    (StatusCode::NO_CONTENT, headers)
}

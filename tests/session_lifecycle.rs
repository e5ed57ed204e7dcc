//! Session lifecycle integration tests.
//!
//! These drive the manager the way an HTTP layer would: build a request,
//! start a session, carry the emitted identifier into the next request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, Request};
use session_keeper::{ManagerConfig, SessionId, SessionManager, TransportMode, Value};

fn manager(mode: TransportMode, max_lifetime_secs: i64) -> SessionManager {
    SessionManager::new(ManagerConfig::new("SID", max_lifetime_secs).with_transport(mode)).unwrap()
}

fn bare_request() -> Request<()> {
    Request::builder().uri("/").body(()).unwrap()
}

/// Turn a `Set-Cookie` header into the `Cookie` header a browser would send.
fn cookie_from(headers: &HeaderMap) -> String {
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn request_with_cookie(cookie: &str) -> Request<()> {
    Request::builder()
        .uri("/")
        .header(header::COOKIE, cookie)
        .body(())
        .unwrap()
}

// ============================================================================
// Identifier round-trips
// ============================================================================

#[test]
fn test_cookie_roundtrip_returns_same_session() {
    let manager = manager(TransportMode::Cookie, 60);

    let mut first_headers = HeaderMap::new();
    let first = manager.start(&bare_request(), &mut first_headers);
    let cookie = cookie_from(&first_headers);

    let mut second_headers = HeaderMap::new();
    let second = manager.start(&request_with_cookie(&cookie), &mut second_headers);

    assert_eq!(first.id(), second.id());
    assert!(first.ptr_eq(&second));
    assert!(second_headers.is_empty(), "existing session must not reset the cookie");
    assert_eq!(manager.session_count(), 1);
}

#[test]
fn test_set_cookie_attributes() {
    let manager = manager(TransportMode::Cookie, 600);
    let mut headers = HeaderMap::new();
    let session = manager.start(&bare_request(), &mut headers);

    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with(&format!("SID={}", session.id())));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=600"));
}

#[test]
fn test_query_roundtrip_returns_same_session() {
    let manager = manager(TransportMode::QueryParameter, 60);
    let first = manager.start(&bare_request(), &mut HeaderMap::new());
    first.set("step", 1);

    let req = Request::builder()
        .uri(format!("/checkout?page=2&SID={}", first.id()))
        .body(())
        .unwrap();
    let second = manager.start(&req, &mut HeaderMap::new());

    assert_eq!(first.id(), second.id());
    assert_eq!(second.get("step"), Some(Value::Int(1)));
}

#[test]
fn test_percent_encoded_identifier_is_decoded() {
    let manager = manager(TransportMode::QueryParameter, 60);
    let first = manager.start(&bare_request(), &mut HeaderMap::new());

    let encoded = first.id().as_str().replace('-', "%2D");
    let req = Request::builder()
        .uri(format!("/?SID={}", encoded))
        .body(())
        .unwrap();
    let second = manager.start(&req, &mut HeaderMap::new());
    assert_eq!(first.id(), second.id());
}

// ============================================================================
// Destroy
// ============================================================================

#[test]
fn test_destroy_then_start_yields_new_session() {
    let manager = manager(TransportMode::Cookie, 60);

    let mut headers = HeaderMap::new();
    let original = manager.start(&bare_request(), &mut headers);
    let cookie = cookie_from(&headers);

    let mut destroy_headers = HeaderMap::new();
    assert!(manager.destroy(&request_with_cookie(&cookie), &mut destroy_headers));
    assert_eq!(manager.session_count(), 0);
    assert!(manager.lookup(original.id()).is_none());

    // The client tries the old id anyway.
    let mut restart_headers = HeaderMap::new();
    let replacement = manager.start(&request_with_cookie(&cookie), &mut restart_headers);
    assert_ne!(replacement.id(), original.id());
    assert!(restart_headers.contains_key(header::SET_COOKIE));
    assert_eq!(manager.session_count(), 1);
}

#[test]
fn test_destroy_expires_cookie() {
    let manager = manager(TransportMode::Cookie, 60);
    let mut headers = HeaderMap::new();
    manager.start(&bare_request(), &mut headers);

    let mut destroy_headers = HeaderMap::new();
    manager.destroy(&request_with_cookie(&cookie_from(&headers)), &mut destroy_headers);

    let set_cookie = destroy_headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("SID=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[test]
fn test_destroy_query_session() {
    let manager = manager(TransportMode::QueryParameter, 60);
    let session = manager.start(&bare_request(), &mut HeaderMap::new());

    let req = Request::builder()
        .uri(format!("/logout?SID={}", session.id()))
        .body(())
        .unwrap();
    let mut headers = HeaderMap::new();
    assert!(manager.destroy(&req, &mut headers));
    assert!(headers.is_empty());

    // Destroying twice is a no-op.
    assert!(!manager.destroy(&req, &mut headers));
}

#[test]
fn test_handle_outlives_destroy() {
    let manager = manager(TransportMode::QueryParameter, 60);
    let session = manager.start(&bare_request(), &mut HeaderMap::new());
    let req = Request::builder()
        .uri(format!("/?SID={}", session.id()))
        .body(())
        .unwrap();

    manager.destroy(&req, &mut HeaderMap::new());

    session.set("after", "destroy");
    assert_eq!(session.get("after"), Some(Value::from("destroy")));
    assert!(manager.lookup(session.id()).is_none());
}

// ============================================================================
// Payload
// ============================================================================

#[test]
fn test_payload_set_get_delete() {
    let manager = manager(TransportMode::Cookie, 60);
    let session = manager.start(&bare_request(), &mut HeaderMap::new());

    assert_eq!(session.get("cart"), None);

    session.set("cart", vec!["apple", "pear"]);
    assert_eq!(
        session.get("cart"),
        Some(Value::List(vec![Value::from("apple"), Value::from("pear")]))
    );

    session.set("coupon", Value::Null);
    assert_eq!(session.get("coupon"), Some(Value::Null));

    session.delete("cart");
    assert_eq!(session.get("cart"), None);
    assert_eq!(session.keys(), vec!["coupon".to_string()]);
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_expiry_scenario() {
    // lifetime 10s: created t=0, read t=9, swept t=15 (idle 6s), swept t=25 (idle 16s)
    let manager = manager(TransportMode::Cookie, 10);
    let session = manager.start(&bare_request(), &mut HeaderMap::new());
    let id = session.id().clone();

    tokio::time::advance(Duration::from_secs(9)).await;
    session.get("anything");

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(manager.sweep(), 0);
    assert!(manager.lookup(&id).is_some());

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(manager.sweep(), 1);
    assert!(manager.lookup(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_expired_cookie_starts_new_session() {
    let manager = manager(TransportMode::Cookie, 10);
    let mut headers = HeaderMap::new();
    let original = manager.start(&bare_request(), &mut headers);
    let cookie = cookie_from(&headers);

    tokio::time::advance(Duration::from_secs(11)).await;
    manager.sweep();

    let replacement = manager.start(&request_with_cookie(&cookie), &mut HeaderMap::new());
    assert_ne!(replacement.id(), original.id());
}

#[tokio::test(start_paused = true)]
async fn test_reaper_evicts_through_manager() {
    let manager = SessionManager::new(
        ManagerConfig::new("SID", 10).with_sweep_interval(Duration::from_secs(1)),
    )
    .unwrap();
    let reaper = manager.spawn_reaper();

    let session = manager.start(&bare_request(), &mut HeaderMap::new());
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert!(manager.lookup(session.id()).is_none());
    assert_eq!(manager.session_count(), 0);
    reaper.shutdown().await;
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_starts_yield_distinct_sessions() {
    let manager = Arc::new(manager(TransportMode::Cookie, 60));

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let mut headers = HeaderMap::new();
                manager.start(&bare_request(), &mut headers).id().clone()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap());
    }

    assert_eq!(ids.len(), 100);
    assert_eq!(manager.session_count(), 100);
}

#[test]
fn test_concurrent_access_to_one_session() {
    let manager = Arc::new(manager(TransportMode::QueryParameter, 60));
    let session = manager.start(&bare_request(), &mut HeaderMap::new());
    let uri = format!("/?SID={}", session.id());

    let threads: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let uri = uri.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let req = Request::builder().uri(uri.as_str()).body(()).unwrap();
                    let s = manager.start(&req, &mut HeaderMap::new());
                    s.update(|values| {
                        let n = values.get("hits").and_then(Value::as_i64).unwrap_or(0);
                        values.insert("hits".into(), Value::Int(n + 1));
                    });
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(session.get("hits"), Some(Value::Int(800)));
    assert_eq!(manager.session_count(), 1);
}

#[test]
fn test_generated_ids_parse_back() {
    let manager = manager(TransportMode::Cookie, 60);
    let session = manager.start(&bare_request(), &mut HeaderMap::new());
    assert_eq!(SessionId::parse(session.id().as_str()).as_ref(), Some(session.id()));
}

//! HTTP surface tests driving the router directly, without a listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chat_service::config::Config;
use chat_service::routes::build_router;
use chat_service::services::{NotificationEmitter, RecordingSink, StaticProfileDirectory};
use chat_service::state::AppState;
use chat_service::store::MemoryStore;
use chat_service::websocket::ConnectionRegistry;
use chat_service::websocket::message_types::ChatEvent;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

fn test_state() -> AppState {
    AppState {
        store: Arc::new(MemoryStore::new()),
        registry: ConnectionRegistry::new(),
        profiles: Arc::new(StaticProfileDirectory::new()),
        emitter: NotificationEmitter::new(Arc::new(RecordingSink::new())),
        config: Arc::new(Config::test_defaults()),
    }
}

fn test_app() -> Router {
    build_router().with_state(test_state())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_session_returns_201_then_200() {
    let app = test_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let body = json!({ "user_a": u1, "user_b": u2 });

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/sessions", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["is_new"], true);
    let session_id = created["id"].as_str().unwrap().to_string();

    // Same pair in reverse order resolves to the same session.
    let response = app
        .oneshot(post_json(
            "/api/v1/sessions",
            json!({ "user_a": u2, "user_b": u1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let existing = json_body(response).await;
    assert_eq!(existing["is_new"], false);
    assert_eq!(existing["id"], session_id.as_str());
}

#[tokio::test]
async fn self_session_returns_400_with_error_envelope() {
    let app = test_app();
    let u = Uuid::new_v4();
    let response = app
        .oneshot(post_json(
            "/api/v1/sessions",
            json!({ "user_a": u, "user_b": u }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["status"], 400);
    assert_eq!(body["code"], "INVALID_OPERATION");
}

#[tokio::test]
async fn send_list_and_read_flow_over_http() {
    let app = test_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions",
            json!({ "user_a": u1, "user_b": u2 }),
        ))
        .await
        .unwrap();
    let session_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            json!({
                "sender_id": u1,
                "text": "Hello",
                "sender_display_name": "Ulla",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let message = json_body(response).await;
    assert_eq!(message["text"], "Hello");
    assert_eq!(message["sequence_number"], 1);

    // The receiver's listing shows the session as unread.
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/users/{u2}/sessions"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["unread"], true);
    assert_eq!(listed[0]["last_message"]["text"], "Hello");

    // History is visible to participants only.
    let outsider = Uuid::new_v4();
    let response = app
        .clone()
        .oneshot(
            Request::get(format!(
                "/api/v1/sessions/{session_id}/messages?user_id={outsider}"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!(
                "/api/v1/sessions/{session_id}/messages?user_id={u2}"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = json_body(response).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    // Marking read clears the unread flag.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/read"),
            json!({ "user_id": u2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::get(format!("/api/v1/users/{u2}/sessions"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_body(response).await;
    assert_eq!(listed[0]["unread"], false);
}

#[tokio::test]
async fn catch_up_query_starts_at_the_boundary_timestamp() {
    let app = test_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions",
            json!({ "user_a": u1, "user_b": u2 }),
        ))
        .await
        .unwrap();
    let session_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            json!({ "sender_id": u1, "text": "first" }),
        ))
        .await
        .unwrap();
    let first_sent_at = json_body(response).await["sent_at"]
        .as_str()
        .unwrap()
        .to_string();

    app.clone()
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            json!({ "sender_id": u2, "text": "second" }),
        ))
        .await
        .unwrap();

    // A reconnecting client passes the last timestamp it saw; the
    // boundary message comes back too and is deduped by sequence.
    let response = app
        .oneshot(
            Request::get(format!(
                "/api/v1/sessions/{session_id}/messages?user_id={u2}&since={first_sent_at}"
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = json_body(response).await;
    let texts: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn mark_read_broadcasts_a_read_receipt() {
    let state = test_state();
    let app = build_router().with_state(state.clone());
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions",
            json!({ "user_a": u1, "user_b": u2 }),
        ))
        .await
        .unwrap();
    let session_id = json_body(response).await["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            json!({ "sender_id": u1, "text": "Hello" }),
        ))
        .await
        .unwrap();

    let mut rx = state.registry.subscribe(&session_id).await;
    let response = app
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/read"),
            json!({ "user_id": u2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let event = rx.recv().await.expect("receipt delivered");
    match event.as_ref() {
        ChatEvent::ReadReceipt { user_id, .. } => assert_eq!(*user_id, u2),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn sending_to_unknown_session_returns_404() {
    let app = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/sessions/does-not-exist/messages",
            json!({ "sender_id": Uuid::new_v4(), "text": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

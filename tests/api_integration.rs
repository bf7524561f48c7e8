//! Integration tests for the session host API
//!
//! Tests API endpoints against an in-process router

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use semshutter::config::ShutterConfig;
use semshutter::core::create_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn create_test_router() -> Router {
    create_router(ShutterConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Rejections come back as plain text
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn new_session(app: &Router, body: Option<Value>) -> String {
    let (status, json) = send(app, "POST", "/session/new", body).await;
    assert_eq!(status, StatusCode::OK);
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions_active"], 0);
}

#[tokio::test]
async fn test_create_session_default_and_explicit_mode() {
    let app = create_test_router();

    let (status, json) = send(&app, "POST", "/session/new", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "standard");
    let id = json["session_id"].as_str().unwrap();
    assert_eq!(json["websocket_url"], format!("/ws/{}", id));

    let (_, json) = send(&app, "POST", "/session/new", Some(json!({"mode": "strict"}))).await;
    assert_eq!(json["mode"], "strict");

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions_active"], 2);
}

#[tokio::test]
async fn test_create_session_rejects_bad_body() {
    let app = create_test_router();

    let (status, _) = send(&app, "POST", "/session/new", Some(json!({"mode": "paranoid"}))).await;
    assert!(status.is_client_error(), "got {}", status);

    let (status, _) = send(&app, "POST", "/session/new", Some(json!([1, 2]))).await;
    assert!(status.is_client_error(), "got {}", status);

    // Nothing was created
    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions_active"], 0);
}

#[tokio::test]
async fn test_create_session_accepts_settings_label() {
    let app = create_test_router();
    let (status, json) = send(
        &app,
        "POST",
        "/session/new",
        Some(json!({"mode": "Lenient (semantic only)"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "lenient");
}

#[tokio::test]
async fn test_session_not_found() {
    let app = create_test_router();

    let (status, _) = send(&app, "GET", "/session/nonexistent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let frame = json!({"object_confidence": 0.9, "hand_object_iou": 0.0, "text_image_similarity": 0.9});
    let (status, _) = send(&app, "POST", "/session/nonexistent/frame", Some(frame)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/session/nonexistent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = create_test_router();
    let id = new_session(&app, None).await;
    let frame_uri = format!("/session/{}/frame", id);
    let frame = json!({
        "object_confidence": 0.9,
        "hand_object_iou": 0.0,
        "text_image_similarity": 0.9,
        "semantic_label": "coffee cup"
    });

    // Frames 1-11 build the streak, frame 12 passes the gate and fires
    for i in 1..=11 {
        let (status, event) = send(&app, "POST", &frame_uri, Some(frame.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(event["frame"], i);
        assert_eq!(event["triggered"], false);
    }
    let (_, event) = send(&app, "POST", &frame_uri, Some(frame.clone())).await;
    assert_eq!(event["triggered"], true);
    assert_eq!(event["trigger"], "gate");
    assert_eq!(event["is_verified"], true);
    assert_eq!(event["reason"], "H001_READY");

    let (status, state) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["captures"], 1);
    assert_eq!(state["state"]["frame"], 12);

    // Reset after the preview
    let (status, state) = send(&app, "POST", &format!("/session/{}/reset", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["state"]["progress"], 0.0);
    assert_eq!(state["state"]["is_verified"], false);
    assert_eq!(state["state"]["frame"], 0);

    let (status, _) = send(&app, "DELETE", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_change_mode() {
    let app = create_test_router();
    let id = new_session(&app, None).await;

    let (status, state) = send(
        &app,
        "PUT",
        &format!("/session/{}/mode", id),
        Some(json!({"mode": "lenient"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["state"]["mode"], "lenient");

    let frame = json!({"object_confidence": 0.0, "hand_object_iou": 0.0, "text_image_similarity": 0.6});
    let (_, event) = send(&app, "POST", &format!("/session/{}/frame", id), Some(frame)).await;
    assert_eq!(event["threshold"], 0.55);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/session/{}/mode", id),
        Some(json!({"mode": "fast"})),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_malformed_frame_rejected() {
    let app = create_test_router();
    let id = new_session(&app, None).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/session/{}/frame", id),
        Some(json!({"object_confidence": 0.9})),
    )
    .await;
    assert!(status.is_client_error());

    // Session untouched
    let (_, state) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(state["state"]["frame"], 0);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let app = create_test_router();
    let a = new_session(&app, None).await;
    let b = new_session(&app, None).await;
    assert_ne!(a, b);

    let frame = json!({"object_confidence": 0.9, "hand_object_iou": 0.0, "text_image_similarity": 0.9});
    for _ in 0..3 {
        send(&app, "POST", &format!("/session/{}/frame", a), Some(frame.clone())).await;
    }

    let (_, state_a) = send(&app, "GET", &format!("/session/{}", a), None).await;
    let (_, state_b) = send(&app, "GET", &format!("/session/{}", b), None).await;
    assert_eq!(state_a["state"]["frame"], 3);
    assert_eq!(state_b["state"]["frame"], 0);
}

#[tokio::test]
async fn test_websocket_requires_upgrade() {
    let app = create_test_router();
    let id = new_session(&app, None).await;

    // Plain GET without upgrade headers is refused
    let (status, _) = send(&app, "GET", &format!("/ws/{}", id), None).await;
    assert!(status.is_client_error());
}

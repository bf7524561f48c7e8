//! HTTP + WebSocket session host
//!
//! One `CaptureDecisionLoop` per session; frames are handed off per request,
//! live events fan out over a broadcast channel.
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /session/new - Create session
//! - GET /session/{id} - Current state
//! - POST /session/{id}/frame - Push one ScoreSample, returns LoopEvent
//! - PUT /session/{id}/mode - Change validation mode
//! - POST /session/{id}/reset - Reset the capture cycle
//! - DELETE /session/{id} - Tear the session down
//! - WS /ws/{id} - Live LoopEvents

use axum::{
    body::Bytes,
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::config::ShutterConfig;
use crate::core::CaptureDecisionLoop;
use crate::types::{LoopEvent, ScoreSample, ValidationMode};

/// Session state
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub capture: CaptureDecisionLoop,
    pub captures: u64,
    pub update_tx: broadcast::Sender<LoopEvent>,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    pub config: ShutterConfig,
    next_id: AtomicU64,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    pub mode: Option<ValidationMode>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
    pub mode: ValidationMode,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub captures: u64,
    pub state: LoopEvent,
}

/// Change mode request
#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: ValidationMode,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Create the API router
pub fn create_router(config: ShutterConfig) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        config,
        next_id: AtomicU64::new(1),
    });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(delete_session))
        .route("/session/:id/frame", post(push_frame))
        .route("/session/:id/mode", put(set_mode))
        .route("/session/:id/reset", post(reset_session))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create new session; an empty body takes the configured defaults
async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<NewSessionResponse>, StatusCode> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        NewSessionRequest::default()
    } else {
        serde_json::from_slice::<NewSessionRequest>(&body).map_err(|e| {
            debug!("api: rejected session request: {}", e);
            StatusCode::UNPROCESSABLE_ENTITY
        })?
    };
    let mode = req.mode.unwrap_or(state.config.mode);
    let seq = state.next_id.fetch_add(1, Ordering::Relaxed);
    let session_id = generate_session_id(seq);
    let (tx, _) = broadcast::channel(256);

    let session = Session {
        id: session_id.clone(),
        capture: CaptureDecisionLoop::with_config(mode, state.config.loop_config()),
        captures: 0,
        update_tx: tx,
    };

    state.sessions.write().await.insert(session_id.clone(), session);
    info!("api: session {} created (mode={})", session_id, mode);

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
        mode,
    }))
}

fn status(session: &Session) -> SessionStatusResponse {
    SessionStatusResponse {
        session_id: session.id.clone(),
        captures: session.captures,
        state: session.capture.current_event(),
    }
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(status(session)))
}

/// Push one frame into the session's loop
async fn push_frame(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(sample): Json<ScoreSample>,
) -> Result<Json<LoopEvent>, StatusCode> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let event = session.capture.on_frame(&sample);
    if event.triggered {
        session.captures += 1;
    }

    // No subscribers is fine
    let _ = session.update_tx.send(event.clone());

    Ok(Json(event))
}

/// Change validation mode
async fn set_mode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<SessionStatusResponse>, StatusCode> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.capture.set_mode(req.mode);
    Ok(Json(status(session)))
}

/// Reset the capture cycle (after the preview completes)
async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, StatusCode> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.capture.reset_cycle();
    let _ = session.update_tx.send(session.capture.current_event());
    Ok(Json(status(session)))
}

/// Tear a session down; live sockets close when the sender drops
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    match state.sessions.write().await.remove(&id) {
        Some(session) => {
            info!(
                "api: session {} closed after {} frames, {} captures",
                id,
                session.capture.frame_count(),
                session.captures
            );
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rx = session.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Forward events until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<LoopEvent>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("api: websocket lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Generate session ID
fn generate_session_id(seq: u64) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("session_{:x}_{}", millis, seq)
}

/// Run the API server
pub async fn run_server(addr: &str, config: ShutterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("semshutter session host running on {}", addr);
    println!("  POST   /session/new        - Create session");
    println!("  GET    /session/:id        - Get state");
    println!("  POST   /session/:id/frame  - Push frame");
    println!("  PUT    /session/:id/mode   - Change mode");
    println!("  POST   /session/:id/reset  - Reset cycle");
    println!("  DELETE /session/:id        - Close session");
    println!("  WS     /ws/:id             - Live events");
    println!("  GET    /health             - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}

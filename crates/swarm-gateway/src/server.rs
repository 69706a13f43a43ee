use crate::api::{self, start_run};
use crate::connection::{Connection, ConnectionManager};
use crate::middleware::{auth_middleware, AuthConfig};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    middleware as axum_mw,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use swarm_orchestrator::{BroadcastObserver, Pipeline};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    /// The pipeline runs are started on.
    pub pipeline: Arc<Pipeline>,
    /// Live WebSocket clients.
    pub connections: Arc<ConnectionManager>,
}

/// Commands a dashboard may send over the WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Start a run for `task`.
    RunTask { task: String },
    /// Ask for the current execution record.
    Status,
}

/// The HTTP and WebSocket front end of a [`Pipeline`].
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router and start forwarding `events` to WebSocket clients.
    ///
    /// `events` should be the observer (or part of the observer) the
    /// pipeline emits to. Must be called from within a Tokio runtime.
    pub fn build(pipeline: Arc<Pipeline>, events: &BroadcastObserver, auth: AuthConfig) -> Router {
        let connections = ConnectionManager::new();
        spawn_event_forwarder(events.subscribe(), connections.clone());

        let state = Arc::new(AppState {
            pipeline,
            connections,
        });

        let endpoints = Router::new()
            .route("/run-task", post(api::run_task))
            .route("/status", get(api::status));

        let app = Router::new()
            .merge(endpoints.clone())
            .nest("/api", endpoints)
            .route("/ws", get(ws_handler))
            .with_state(state);

        let app = if auth.is_enabled() {
            app.layer(axum_mw::from_fn_with_state(Arc::new(auth), auth_middleware))
        } else {
            app
        };

        app.route("/health", get(health_handler))
    }
}

/// Relay pipeline events to every connected client as JSON text.
fn spawn_event_forwarder(
    mut rx: broadcast::Receiver<swarm_orchestrator::ProgressEvent>,
    connections: Arc<ConnectionManager>,
) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(text) => connections.broadcast(&text).await,
                    Err(e) => warn!(error = %e, "Failed to serialize progress event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event forwarder lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Event forwarder stopped");
    });
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "mcp-swarm"}))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn status_message(state: &AppState) -> String {
    json!({"event": "status", "data": state.pipeline.status().await}).to_string()
}

async fn handle_command(state: &AppState, text: &str) -> String {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(c) => c,
        Err(e) => {
            return json!({"event": "error", "data": {"error": format!("Invalid message: {e}")}})
                .to_string()
        }
    };
    match command {
        ClientCommand::Status => status_message(state).await,
        ClientCommand::RunTask { task } => {
            let task = task.trim().to_string();
            if task.is_empty() {
                return json!({"event": "task-rejected", "data": {"error": "Task is required"}})
                    .to_string();
            }
            match start_run(&state.pipeline, &task).await {
                Ok(run_id) => {
                    json!({"event": "task-accepted", "data": {"runId": run_id, "task": task}})
                        .to_string()
                }
                Err(e) => {
                    json!({"event": "task-rejected", "data": {"error": e.to_string()}}).to_string()
                }
            }
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    use futures_util::{SinkExt, StreamExt};

    let connection_id = Uuid::new_v4();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state.connections.add(Connection { id: connection_id, tx }).await;
    info!(connection_id = %connection_id, "WebSocket connected");

    // Late joiners see the current run straight away.
    let snapshot = status_message(&state).await;
    state.connections.send_to(connection_id, &snapshot).await;

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let reply = handle_command(&recv_state, text.as_str()).await;
                    recv_state.connections.send_to(connection_id, &reply).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.connections.remove(connection_id).await;
    info!(connection_id = %connection_id, "WebSocket disconnected");
}

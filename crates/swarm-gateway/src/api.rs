use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use swarm_core::{SwarmError, SwarmResult};
use swarm_orchestrator::{ExecutionRecord, Pipeline};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Error body returned by the HTTP API: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// An error response with `status` and `message`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A 400 response.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<SwarmError> for ApiError {
    fn from(e: SwarmError) -> Self {
        match e {
            SwarmError::ConcurrentRun => Self::new(StatusCode::CONFLICT, e.to_string()),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Pull a non-blank `task` string out of a request body.
pub fn parse_task(body: &[u8]) -> Result<String, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
    value
        .get("task")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Task is required"))
}

/// Register a run and execute it in the background.
///
/// The run is registered before this returns, so a second call made right
/// after is rejected with [`SwarmError::ConcurrentRun`].
pub async fn start_run(pipeline: &Arc<Pipeline>, task: &str) -> SwarmResult<Uuid> {
    let run_id = pipeline.begin(task).await?;
    let store = pipeline.store().clone();
    let runner = pipeline.clone();
    let handle = tokio::spawn(async move {
        // Failures are already recorded and announced by the pipeline.
        let _ = runner.execute(run_id).await;
    });
    tokio::spawn(async move {
        // A run that dies without settling must not hold the running slot.
        if let Err(e) = handle.await {
            error!(%run_id, error = %e, "Run task aborted");
            store.fail(run_id, format!("Run aborted: {e}")).await;
        }
    });
    Ok(run_id)
}

/// `POST /run-task`: accept a task and start it without waiting.
pub async fn run_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let task = parse_task(&body)?;
    let run_id = start_run(&state.pipeline, &task).await.map_err(|e| {
        warn!(error = %e, "Rejected run-task request");
        ApiError::from(e)
    })?;
    info!(%run_id, task = %task, "Task accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Task started",
            "task": task,
            "runId": run_id,
        })),
    ))
}

/// `GET /status`: the latest execution record.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ExecutionRecord> {
    Json(state.pipeline.status().await)
}

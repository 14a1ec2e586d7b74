//! Axum request handlers for the local job server.
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::routes::AppState;
use crate::job::{Job, JobResponse};

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub id: Option<String>,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub id: String,
    pub status: String,
    pub output: JobResponse,
}

pub async fn root() -> &'static str {
    "ComfyUI worker"
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Run one job to completion and return its output.
pub async fn runsync(State(state): State<Arc<AppState>>, Json(request): Json<RunRequest>) -> Json<RunResponse> {
    let job = Job {
        id: request.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        input: request.input,
    };

    let _running = state.running.lock().await;
    let output = state.worker.handle(&job).await;
    let status = match output {
        JobResponse::Completed(_) => "COMPLETED",
        JobResponse::UploadFailed(_) | JobResponse::Failed { .. } => "FAILED",
    };

    Json(RunResponse { id: job.id, status: status.to_string(), output })
}

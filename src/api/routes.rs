//! Router and shared state for the local job server.
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::worker::Worker;

pub struct AppState {
    pub worker: Worker,
    /// Held for the duration of a job so jobs never overlap.
    pub running: Mutex<()>,
}

impl AppState {
    pub fn new(worker: Worker) -> Self {
        AppState { worker, running: Mutex::new(()) }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/runsync", post(handlers::runsync))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

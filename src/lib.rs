//! ComfyUI serverless worker library
//!
//! Modules:
//! - `worker`: The job pipeline and the `Worker` handler that runs it.
//! - `comfyui`: Thin client and wire types for ComfyUI REST endpoints.
//! - `storage`: Object-storage seam and its S3-compatible implementation.
//! - `job`: Job payloads and response envelopes.
//! - `api`: Axum handlers and router for the local job server.
//! - `utils`: Base64 helpers.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `ComfyUIClient`,
//! `Worker`, `Job` and `JobResponse`.
pub mod api;
pub mod comfyui;
pub mod config;
pub mod error;
pub mod job;
pub mod storage;
pub mod utils;
pub mod worker;

pub use comfyui::client::ComfyUIClient;
pub use config::Config;
pub use error::{WorkerError, WorkerResult};
pub use job::{Job, JobResponse};
pub use worker::Worker;

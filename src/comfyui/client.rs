//! Thin HTTP client for ComfyUI endpoints.
//!
//! - `check_available` probes `/`.
//! - `upload_image` posts a multipart form to `/upload/image`.
//! - `queue_workflow` posts a workflow to `/prompt`.
//! - `get_history` fetches `/history/{prompt_id}`.
use std::collections::HashMap;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::comfyui::types::{HistoryRecord, QueuedWorkflow};
use crate::error::{WorkerError, WorkerResult};

#[derive(Clone)]
pub struct ComfyUIClient {
    client: Client,
    base_url: String,
}

impl ComfyUIClient {
    pub fn new(base_url: String) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: Client, base_url: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        ComfyUIClient { client, base_url: base }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Ok` when `GET /` answers 200.
    pub async fn check_available(&self) -> WorkerResult<()> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(WorkerError::ComfyUI { status: status.as_u16(), body: String::new() })
        }
    }

    /// Upload an image into ComfyUI's input folder, replacing any file with
    /// the same name.
    pub async fn upload_image(&self, name: &str, bytes: Vec<u8>) -> WorkerResult<()> {
        let url = format!("{}/upload/image", self.base_url);
        let part = Part::bytes(bytes).file_name(name.to_string()).mime_str("image/png")?;
        let form = Form::new().part("image", part).text("overwrite", "true");

        tracing::debug!("Uploading {} to {}", name, url);
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Queue a workflow with ComfyUI.
    ///
    /// The workflow is wrapped in the top-level `prompt` key the endpoint
    /// requires.
    pub async fn queue_workflow(&self, workflow: &Value) -> WorkerResult<QueuedWorkflow> {
        let url = format!("{}/prompt", self.base_url);
        tracing::info!("Sending workflow to ComfyUI at URL: {}", url);
        tracing::debug!("Workflow payload: {:?}", workflow);

        let response = self.client.post(&url).json(&json!({ "prompt": workflow })).send().await?;
        let queued: QueuedWorkflow = Self::parse_response(response).await?;
        tracing::debug!("Queue position: {:?}", queued.number);
        Ok(queued)
    }

    /// History entry for `prompt_id`, or `None` while ComfyUI has not
    /// recorded it yet.
    pub async fn get_history(&self, prompt_id: &str) -> WorkerResult<Option<HistoryRecord>> {
        let url = format!("{}/history/{}", self.base_url, prompt_id);
        let response = self.client.get(&url).send().await?;
        let mut history: HashMap<String, HistoryRecord> = Self::parse_response(response).await?;
        Ok(history.remove(prompt_id))
    }

    /// Raw history entry, as ComfyUI returned it.
    pub async fn get_history_raw(&self, prompt_id: &str) -> WorkerResult<Value> {
        let url = format!("{}/history/{}", self.base_url, prompt_id);
        let response = self.client.get(&url).send().await?;
        Self::parse_response(response).await
    }

    async fn ensure_success(response: Response) -> WorkerResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
        tracing::error!("ComfyUI returned {}: {}", status, body);
        Err(WorkerError::ComfyUI { status: status.as_u16(), body })
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> WorkerResult<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

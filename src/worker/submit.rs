//! Queues the validated workflow with ComfyUI.
use serde_json::Value;

use crate::comfyui::client::ComfyUIClient;
use crate::error::{WorkerError, WorkerResult};

/// Submit `workflow` and return the prompt id ComfyUI assigned. Not retried.
pub async fn submit_workflow(client: &ComfyUIClient, workflow: &Value) -> WorkerResult<String> {
    match client.queue_workflow(workflow).await {
        Ok(queued) => {
            tracing::info!("Queued workflow with ID {}", queued.prompt_id);
            Ok(queued.prompt_id)
        }
        Err(e) => Err(WorkerError::Queue(format!("Error queuing workflow: {}", e))),
    }
}

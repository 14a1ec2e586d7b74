//! Readiness probe and completion polling against ComfyUI.
use crate::comfyui::client::ComfyUIClient;
use crate::comfyui::types::HistoryRecord;
use crate::config::RetryPolicy;
use crate::worker::retry::{retry, Outcome, Step};

/// Wait until `GET /` answers 200. Connection failures and other statuses
/// count as "not ready yet"; the outcome is never `Failed`.
pub async fn wait_until_available(client: &ComfyUIClient, policy: RetryPolicy) -> Outcome<()> {
    let outcome = retry(policy, || async move {
        match client.check_available().await {
            Ok(()) => Step::Done(()),
            Err(e) => {
                tracing::trace!("ComfyUI not ready: {}", e);
                Step::Pending
            }
        }
    })
    .await;

    match &outcome {
        Outcome::Ready(()) => tracing::info!("ComfyUI API is reachable"),
        Outcome::TimedOut { attempts } => {
            tracing::warn!("Failed to connect to ComfyUI at {} after {} attempts", client.base_url(), attempts)
        }
        Outcome::Failed(_) => {}
    }
    outcome
}

/// Poll `/history/{prompt_id}` until the record carries outputs. Transport
/// and decoding failures end the loop immediately.
pub async fn wait_for_outputs(client: &ComfyUIClient, prompt_id: &str, policy: RetryPolicy) -> Outcome<HistoryRecord> {
    tracing::info!("Waiting for image generation of {}", prompt_id);
    retry(policy, || async move {
        match client.get_history(prompt_id).await {
            Ok(Some(record)) if record.is_complete() => Step::Done(record),
            Ok(_) => Step::Pending,
            Err(e) => Step::Abort(e),
        }
    })
    .await
}

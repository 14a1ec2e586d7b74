//! Job handler: composes the pipeline stages and turns every failure into a
//! response value. Nothing escapes to the caller.
use std::sync::Arc;

use tracing::Instrument;

use crate::comfyui::client::ComfyUIClient;
use crate::config::Config;
use crate::error::{WorkerError, WorkerResult};
use crate::job::{Job, JobResponse, ResultEnvelope};
use crate::storage::{ObjectStore, S3ObjectStore};
use crate::worker::output::OutputResolver;
use crate::worker::poll::{wait_for_outputs, wait_until_available};
use crate::worker::retry::Outcome;
use crate::worker::submit::submit_workflow;
use crate::worker::upload::upload_images;
use crate::worker::validate::validate_input;

#[derive(Clone)]
pub struct Worker {
    config: Config,
    client: ComfyUIClient,
    store: Option<Arc<dyn ObjectStore>>,
}

impl Worker {
    /// Build a worker from configuration. An object store is set up when a
    /// bucket endpoint is configured.
    pub fn new(config: Config) -> WorkerResult<Self> {
        let store = match &config.bucket {
            Some(bucket) => Some(Arc::new(S3ObjectStore::from_config(bucket)?) as Arc<dyn ObjectStore>),
            None => None,
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Option<Arc<dyn ObjectStore>>) -> Self {
        let client = ComfyUIClient::new(config.comfy_url());
        Worker { config, client, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ComfyUIClient {
        &self.client
    }

    pub async fn handle(&self, job: &Job) -> JobResponse {
        let span = tracing::info_span!("job", id = %job.id);
        self.run(job).instrument(span).await
    }

    async fn run(&self, job: &Job) -> JobResponse {
        let input = match validate_input(&job.input) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!("Rejected job input: {}", e);
                return JobResponse::failed(e.to_string());
            }
        };

        if let Outcome::TimedOut { .. } = wait_until_available(&self.client, self.config.availability).await {
            tracing::debug!("Continuing without a ready signal from ComfyUI");
        }

        let upload = upload_images(&self.client, &input.images).await;
        if !upload.is_success() {
            return JobResponse::UploadFailed(upload);
        }

        let prompt_id = match submit_workflow(&self.client, &input.workflow).await {
            Ok(prompt_id) => prompt_id,
            Err(e) => {
                tracing::error!("{}", e);
                return JobResponse::failed(e.to_string());
            }
        };

        let record = match wait_for_outputs(&self.client, &prompt_id, self.config.polling).await {
            Outcome::Ready(record) => record,
            Outcome::TimedOut { attempts } => {
                let e = WorkerError::Timeout("Max retries reached while waiting for image generation".into());
                tracing::error!(attempts, "{}", e);
                return JobResponse::failed(e.to_string());
            }
            Outcome::Failed(e) => {
                tracing::error!("Error waiting for image generation: {}", e);
                return JobResponse::failed(format!("Error waiting for image generation: {}", e));
            }
        };

        let resolver = OutputResolver::new(&self.config.output_path, self.store.as_deref());
        let report = resolver.resolve(&record.outputs, &job.id).await;
        tracing::info!(success = report.is_success(), input_bytes = upload.input_bytes, "Job finished");

        JobResponse::Completed(ResultEnvelope { report, refresh_worker: self.config.refresh_worker })
    }
}

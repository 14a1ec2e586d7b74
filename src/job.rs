//! Job payloads handed to the worker and the responses it returns.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unit of work as delivered by the queue runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub input: Value,
}

/// An input image to place in ComfyUI's input folder before the workflow runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputImage {
    pub name: String,
    /// Base64 payload, optionally prefixed with a `data:` URI header.
    pub image: String,
}

/// Job input after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub workflow: Value,
    pub images: Vec<InputImage>,
}

/// A generated image, either inline base64 or a URL into object storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolvedImage {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Message {
    Results { results: Vec<ResolvedImage> },
    Text(String),
}

/// Outcome of the output stage, before the worker flags are attached.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputReport {
    pub status: Status,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl OutputReport {
    pub fn success(results: Vec<ResolvedImage>, errors: Vec<String>) -> Self {
        OutputReport {
            status: Status::Success,
            message: Message::Results { results },
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    pub fn error(message: impl Into<String>, errors: Vec<String>) -> Self {
        OutputReport { status: Status::Error, message: Message::Text(message.into()), errors: Some(errors) }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn results(&self) -> &[ResolvedImage] {
        match &self.message {
            Message::Results { results } => results,
            Message::Text(_) => &[],
        }
    }
}

/// Terminal envelope for a job that reached the output stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResultEnvelope {
    #[serde(flatten)]
    pub report: OutputReport,
    pub refresh_worker: bool,
}

/// Result of pushing the job's input images to ComfyUI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadReport {
    pub status: Status,
    pub message: String,
    pub details: Vec<String>,
    /// Summed length of the base64 payloads, for diagnostics only.
    #[serde(skip)]
    pub input_bytes: usize,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Everything the handler can hand back to the queue runtime.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum JobResponse {
    Completed(ResultEnvelope),
    UploadFailed(UploadReport),
    Failed { error: String },
}

impl JobResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        JobResponse::Failed { error: error.into() }
    }

    /// True when the job produced at least one image.
    pub fn is_success(&self) -> bool {
        matches!(self, JobResponse::Completed(envelope) if envelope.report.is_success())
    }
}

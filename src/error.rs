//! Common error type and result alias.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    MalformedImages(String),

    #[error("failed to decode base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{0}")]
    Queue(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    OutputMissing(String),

    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// ComfyUI answered with a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ComfyUI { status: u16, body: String },

    #[error("object storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

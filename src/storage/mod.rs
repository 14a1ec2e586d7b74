//! Object storage for generated images.
//!
//! The worker only needs "put this file somewhere and give me a URL", so the
//! seam is a single-method trait. [`S3ObjectStore`] backs it with any
//! S3-compatible bucket.
use std::path::Path;

use async_trait::async_trait;

use crate::error::WorkerResult;

pub mod s3;

pub use s3::S3ObjectStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` under the job's prefix and return its URL.
    async fn upload_image(&self, job_id: &str, path: &Path) -> WorkerResult<String>;
}

/// Object key for a generated file: `<job_id>/<file name>`.
pub fn object_key(job_id: &str, path: &Path) -> String {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    format!("{}/{}", job_id, file_name)
}

/// Content type guessed from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "image/png",
    }
}

//! S3-compatible [`ObjectStore`] built on `rust-s3`.
use std::path::Path;

use async_trait::async_trait;
use reqwest::Url;
use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::config::BucketConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::storage::{content_type_for, object_key, ObjectStore};

const DEFAULT_REGION: &str = "us-east-1";
/// Lifetime of the returned download links: seven days, the S3 maximum.
const URL_EXPIRY_SECS: u32 = 604_800;

pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

/// Where the bucket lives and how it is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BucketLocation {
    name: String,
    endpoint: String,
    path_style: bool,
}

impl S3ObjectStore {
    pub fn from_config(config: &BucketConfig) -> WorkerResult<Self> {
        let location = locate_bucket(&config.endpoint_url, config.bucket_name.as_deref())?;
        let region = Region::Custom {
            region: config.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: location.endpoint.clone(),
        };
        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| WorkerError::Storage(e.to_string()))?;

        let bucket = Bucket::new(&location.name, region, credentials).map_err(|e| WorkerError::Storage(e.to_string()))?;
        let bucket: Box<Bucket> = if location.path_style { bucket.with_path_style().into() } else { bucket.into() };

        tracing::info!("Object storage enabled: bucket '{}' at {}", location.name, location.endpoint);
        Ok(S3ObjectStore { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload_image(&self, job_id: &str, path: &Path) -> WorkerResult<String> {
        let key = object_key(job_id, path);
        let bytes = tokio::fs::read(path).await?;

        let response = self
            .bucket
            .put_object_with_content_type(&key, &bytes, content_type_for(path))
            .await
            .map_err(|e| WorkerError::Storage(e.to_string()))?;
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(WorkerError::Storage(format!("upload of {} returned status {}", key, status)));
        }

        self.bucket
            .presign_get(&key, URL_EXPIRY_SECS, None)
            .await
            .map_err(|e| WorkerError::Storage(e.to_string()))
    }
}

/// Resolve the bucket name and API endpoint.
///
/// With an explicit name the endpoint is used as-is in path style. Without
/// one the endpoint is virtual-hosted: the first host label is the bucket.
fn locate_bucket(endpoint_url: &str, bucket_name: Option<&str>) -> WorkerResult<BucketLocation> {
    let url = Url::parse(endpoint_url)
        .map_err(|e| WorkerError::Config(format!("BUCKET_ENDPOINT_URL '{}' is not a URL: {}", endpoint_url, e)))?;

    if let Some(name) = bucket_name {
        return Ok(BucketLocation {
            name: name.to_string(),
            endpoint: endpoint_url.trim_end_matches('/').to_string(),
            path_style: true,
        });
    }

    let host = url
        .host_str()
        .ok_or_else(|| WorkerError::Config(format!("BUCKET_ENDPOINT_URL '{}' has no host", endpoint_url)))?;
    let (name, rest) = host
        .split_once('.')
        .ok_or_else(|| WorkerError::Config(format!("cannot derive bucket name from '{}'; set BUCKET_NAME", host)))?;
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    Ok(BucketLocation {
        name: name.to_string(),
        endpoint: format!("{}://{}{}", url.scheme(), rest, port),
        path_style: false,
    })
}

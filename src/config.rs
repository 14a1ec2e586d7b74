//! Env-driven configuration for the worker and its binaries.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults match a stock ComfyUI worker image.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

const ENV_VARS: &[&str] = &[
    "COMFY_HOST",
    "COMFY_API_AVAILABLE_INTERVAL_MS",
    "COMFY_API_AVAILABLE_MAX_RETRIES",
    "COMFY_POLLING_INTERVAL_MS",
    "COMFY_POLLING_MAX_RETRIES",
    "COMFY_OUTPUT_PATH",
    "BUCKET_ENDPOINT_URL",
    "BUCKET_NAME",
    "BUCKET_REGION",
    "REFRESH_WORKER",
    "API_HOST",
    "API_PORT",
];

/// Interval and attempt cap for one of the bounded retry loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval_ms: u64, max_attempts: u32) -> Self {
        RetryPolicy { interval: Duration::from_millis(interval_ms), max_attempts }
    }
}

/// Connection details for the S3-compatible bucket results are uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketConfig {
    pub endpoint_url: String,
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// ComfyUI `host:port`, without scheme.
    pub comfy_host: String,
    pub availability: RetryPolicy,
    pub polling: RetryPolicy,
    pub output_path: PathBuf,
    pub bucket: Option<BucketConfig>,
    pub refresh_worker: bool,
    pub api_host: String,
    pub api_port: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            comfy_host: "127.0.0.1:8188".to_string(),
            availability: RetryPolicy::new(50, 500),
            polling: RetryPolicy::new(250, 500),
            output_path: PathBuf::from("/comfyui/output"),
            bucket: None,
            refresh_worker: false,
            api_host: "127.0.0.1".to_string(),
            api_port: "8000".to_string(),
        }
    }
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> WorkerResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let bucket = non_empty("BUCKET_ENDPOINT_URL").map(|endpoint_url| BucketConfig {
            endpoint_url,
            bucket_name: non_empty("BUCKET_NAME"),
            region: non_empty("BUCKET_REGION"),
            access_key_id: non_empty("BUCKET_ACCESS_KEY_ID"),
            secret_access_key: non_empty("BUCKET_SECRET_ACCESS_KEY"),
        });

        Ok(Config {
            comfy_host: lookup("COMFY_HOST").unwrap_or(defaults.comfy_host),
            availability: RetryPolicy {
                interval: Duration::from_millis(parse_var(&lookup, "COMFY_API_AVAILABLE_INTERVAL_MS", 50)?),
                max_attempts: parse_var(&lookup, "COMFY_API_AVAILABLE_MAX_RETRIES", 500)?,
            },
            polling: RetryPolicy {
                interval: Duration::from_millis(parse_var(&lookup, "COMFY_POLLING_INTERVAL_MS", 250)?),
                max_attempts: parse_var(&lookup, "COMFY_POLLING_MAX_RETRIES", 500)?,
            },
            output_path: lookup("COMFY_OUTPUT_PATH").map(PathBuf::from).unwrap_or(defaults.output_path),
            bucket,
            refresh_worker: lookup("REFRESH_WORKER").map(|v| parse_flag(&v)).unwrap_or(false),
            api_host: lookup("API_HOST").unwrap_or(defaults.api_host),
            api_port: lookup("API_PORT").unwrap_or(defaults.api_port),
        })
    }

    /// Base URL of the ComfyUI HTTP API.
    pub fn comfy_url(&self) -> String {
        format!("http://{}", self.comfy_host.trim_end_matches('/'))
    }

    pub fn print_env_vars() {
        for name in ENV_VARS {
            tracing::info!("{}: {}", name, env::var(name).unwrap_or_else(|_| "<unset>".to_string()));
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> WorkerResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WorkerError::Config(format!("{} must be a non-negative integer, got '{}'", name, raw))),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

//! Maps ComfyUI output descriptors to files on disk and returns them inline or
//! as object-storage URLs.
//!
//! Resolution is a two-strategy attempt. The list strategy reads the
//! `images` descriptors of every node strictly and records a per-file error
//! for anything it cannot resolve. Only when that yields no image at all does
//! the fallback run: it discovers descriptors leniently (any object with a
//! `filename`, under any output key) and treats a missing file as fatal.
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::comfyui::types::OutputImage;
use crate::error::{WorkerError, WorkerResult};
use crate::job::{OutputReport, ResolvedImage};
use crate::storage::ObjectStore;
use crate::utils::encoding::encode_file;

/// Result of the list strategy.
#[derive(Debug, Default)]
pub struct ListResolution {
    pub resolved: Vec<ResolvedImage>,
    pub errors: Vec<String>,
}

pub struct OutputResolver<'a> {
    output_path: &'a Path,
    /// Upload target; `None` means results are returned as base64.
    store: Option<&'a dyn ObjectStore>,
}

impl<'a> OutputResolver<'a> {
    pub fn new(output_path: &'a Path, store: Option<&'a dyn ObjectStore>) -> Self {
        OutputResolver { output_path, store }
    }

    pub async fn resolve(&self, outputs: &Map<String, Value>, job_id: &str) -> OutputReport {
        let list = self.resolve_list(outputs, job_id).await;
        if !list.resolved.is_empty() {
            tracing::info!(resolved = list.resolved.len(), errors = list.errors.len(), "Image generation is done");
            return OutputReport::success(list.resolved, list.errors);
        }

        tracing::warn!("No image resolved from the output list, trying single descriptors");
        match self.resolve_fallback(outputs, job_id).await {
            Ok(resolved) if !resolved.is_empty() => OutputReport::success(resolved, list.errors),
            Ok(_) => OutputReport::error("No images were successfully processed.", list.errors),
            Err(e) => {
                tracing::error!("{}", e);
                OutputReport::error(e.to_string(), list.errors)
            }
        }
    }

    /// Strict pass over every node's `images` list.
    pub async fn resolve_list(&self, outputs: &Map<String, Value>, job_id: &str) -> ListResolution {
        let mut list = ListResolution::default();

        for (node_id, node_output) in outputs {
            let entries = match node_output.get("images") {
                None => continue,
                Some(Value::Array(entries)) => entries,
                Some(_) => {
                    list.errors.push(format!("Node {}: 'images' is not a list", node_id));
                    continue;
                }
            };

            for entry in entries {
                let descriptor: OutputImage = match serde_json::from_value(entry.clone()) {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        list.errors.push(format!("Node {}: malformed output descriptor: {}", node_id, e));
                        continue;
                    }
                };

                let path = self.local_path(&descriptor.subfolder, &descriptor.filename);
                if !file_exists(&path).await {
                    let message = format!("Image not found: {}", path.display());
                    tracing::warn!("{}", message);
                    list.errors.push(message);
                    continue;
                }

                match self.convert(job_id, &path).await {
                    Ok(image) => list.resolved.push(ResolvedImage { name: descriptor.filename, image }),
                    Err(e) => list.errors.push(format!("Failed to process {}: {}", path.display(), e)),
                }
            }
        }
        list
    }

    /// Lenient pass; any missing or unconvertible file fails the whole set.
    pub async fn resolve_fallback(&self, outputs: &Map<String, Value>, job_id: &str) -> WorkerResult<Vec<ResolvedImage>> {
        let mut found = Vec::new();
        for node_output in outputs.values() {
            collect_descriptors(node_output, &mut found);
        }

        let mut resolved = Vec::with_capacity(found.len());
        for (subfolder, filename) in found {
            let path = self.local_path(&subfolder, &filename);
            if !file_exists(&path).await {
                return Err(WorkerError::OutputMissing(format!(
                    "the image does not exist in the specified output folder: {}",
                    path.display()
                )));
            }
            let image = self.convert(job_id, &path).await?;
            resolved.push(ResolvedImage { name: filename, image });
        }
        Ok(resolved)
    }

    fn local_path(&self, subfolder: &str, filename: &str) -> PathBuf {
        self.output_path.join(subfolder).join(filename)
    }

    async fn convert(&self, job_id: &str, path: &Path) -> WorkerResult<String> {
        match self.store {
            Some(store) => store.upload_image(job_id, path).await,
            None => encode_file(path).await,
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Collect `(subfolder, filename)` from every object carrying a string
/// `filename`, at any depth.
fn collect_descriptors(v: &Value, out: &mut Vec<(String, String)>) {
    match v {
        Value::Object(map) => {
            if let Some(Value::String(filename)) = map.get("filename") {
                let subfolder = map.get("subfolder").and_then(Value::as_str).unwrap_or_default();
                out.push((subfolder.to_string(), filename.clone()));
                return;
            }
            for vv in map.values() {
                collect_descriptors(vv, out);
            }
        }
        Value::Array(arr) => {
            for vv in arr {
                collect_descriptors(vv, out);
            }
        }
        _ => {}
    }
}

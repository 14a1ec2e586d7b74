//! Base64 helpers shared by the upload and output stages.
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::WorkerResult;
use crate::job::InputImage;

/// Decode a base64 payload, tolerating a leading `data:<mime>;base64,` header
/// and line wrapping.
pub fn decode_payload(payload: &str) -> WorkerResult<Vec<u8>> {
    let body = match payload.split_once(";base64,") {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => payload,
    };
    let compact: Vec<u8> = body.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    Ok(BASE64.decode(compact)?)
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub async fn encode_file(path: &Path) -> WorkerResult<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_bytes(&bytes))
}

/// Summed length of the encoded payloads, as submitted.
pub fn payload_size(images: &[InputImage]) -> usize {
    images.iter().map(|image| image.image.len()).sum()
}

//! Pushes job input images into ComfyUI before the workflow is queued.
use crate::comfyui::client::ComfyUIClient;
use crate::job::{InputImage, Status, UploadReport};
use crate::utils::encoding::{decode_payload, payload_size};

/// Upload every image, best effort: a failure is recorded and the remaining
/// images are still attempted.
pub async fn upload_images(client: &ComfyUIClient, images: &[InputImage]) -> UploadReport {
    if images.is_empty() {
        return UploadReport {
            status: Status::Success,
            message: "No images to upload".into(),
            details: Vec::new(),
            input_bytes: 0,
        };
    }

    tracing::info!("Uploading {} input image(s)", images.len());
    let mut uploaded = Vec::new();
    let mut failures = Vec::new();

    for image in images {
        let bytes = match decode_payload(&image.image) {
            Ok(bytes) => bytes,
            Err(e) => {
                failures.push(format!("Error decoding {}: {}", image.name, e));
                continue;
            }
        };
        match client.upload_image(&image.name, bytes).await {
            Ok(()) => uploaded.push(format!("Successfully uploaded {}", image.name)),
            Err(e) => failures.push(format!("Error uploading {}: {}", image.name, e)),
        }
    }

    let input_bytes = payload_size(images);
    tracing::info!(input_bytes, "Size of input images");

    if failures.is_empty() {
        tracing::info!("Image upload complete");
        UploadReport {
            status: Status::Success,
            message: "All images uploaded successfully".into(),
            details: uploaded,
            input_bytes,
        }
    } else {
        tracing::warn!("Image upload finished with {} error(s)", failures.len());
        UploadReport {
            status: Status::Error,
            message: "Some images failed to upload".into(),
            details: failures,
            input_bytes,
        }
    }
}

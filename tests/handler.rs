//! End-to-end tests for [`Worker::handle`] against a mocked ComfyUI.
//!
//! The backend is a `mockito` server and the output folder is a temporary
//! directory, so every scenario runs without a GPU or network access.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use comfy_worker::config::{Config, RetryPolicy};
use comfy_worker::job::{Job, JobResponse, Message, Status};
use comfy_worker::storage::{object_key, ObjectStore};
use comfy_worker::utils::encoding::encode_bytes;
use comfy_worker::{Worker, WorkerResult};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};

const PROMPT_ID: &str = "p-1";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStore {
    keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload_image(&self, job_id: &str, path: &Path) -> WorkerResult<String> {
        let key = object_key(job_id, path);
        self.keys.lock().unwrap().push(key.clone());
        Ok(format!("https://renders.example.com/{}", key))
    }
}

fn config(server: &ServerGuard, output_path: &Path) -> Config {
    Config {
        comfy_host: server.host_with_port(),
        availability: RetryPolicy::new(0, 3),
        polling: RetryPolicy::new(0, 5),
        output_path: output_path.to_path_buf(),
        ..Config::default()
    }
}

fn job(input: Value) -> Job {
    Job { id: "job-1".into(), input }
}

fn workflow() -> Value {
    json!({
        "3": {"class_type": "KSampler", "inputs": {"seed": 42}},
        "9": {"class_type": "SaveImage", "inputs": {"filename_prefix": "ComfyUI"}}
    })
}

async fn mock_ready(server: &mut ServerGuard) -> Mock {
    server.mock("GET", "/").with_status(200).create_async().await
}

async fn mock_queue(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/prompt")
        .match_body(Matcher::Json(json!({"prompt": workflow()})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"prompt_id": PROMPT_ID, "number": 0, "node_errors": {}}).to_string())
        .create_async()
        .await
}

async fn mock_history(server: &mut ServerGuard, body: Value) -> Mock {
    server
        .mock("GET", format!("/history/{}", PROMPT_ID).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

fn one_image_history(filename: &str) -> Value {
    json!({
        PROMPT_ID: {
            "outputs": {"9": {"images": [{"filename": filename, "subfolder": "", "type": "output"}]}},
            "status": {"status_str": "success", "completed": true}
        }
    })
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

/// A job with one input image and one generated file returns that file as
/// base64 in the documented envelope.
#[tokio::test]
async fn generated_image_is_returned_inline() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();
    tokio::fs::write(output.path().join("ComfyUI_00001_.png"), b"generated-pixels").await.unwrap();

    let _ready = mock_ready(&mut server).await;
    let upload = server
        .mock("POST", "/upload/image")
        .match_body(Matcher::Regex(r#"filename="a.png""#.into()))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let queue = mock_queue(&mut server).await;
    let _history = mock_history(&mut server, one_image_history("ComfyUI_00001_.png")).await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker
        .handle(&job(json!({
            "workflow": workflow(),
            "images": [{"name": "a.png", "image": encode_bytes(b"input-pixels")}]
        })))
        .await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "status": "success",
            "message": {"results": [{"name": "ComfyUI_00001_.png", "image": encode_bytes(b"generated-pixels")}]},
            "refresh_worker": false
        })
    );
    upload.assert_async().await;
    queue.assert_async().await;
}

/// With an object store configured the same job yields URLs instead of base64.
#[tokio::test]
async fn object_store_yields_urls() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();
    tokio::fs::write(output.path().join("ComfyUI_00001_.png"), b"generated-pixels").await.unwrap();

    let _ready = mock_ready(&mut server).await;
    let _mock = server.mock("POST", "/upload/image").with_status(200).with_body("{}").create_async().await;
    let _queue = mock_queue(&mut server).await;
    let _history = mock_history(&mut server, one_image_history("ComfyUI_00001_.png")).await;

    let store = Arc::new(MemoryStore::default());
    let worker = Worker::with_store(config(&server, output.path()), Some(store.clone() as Arc<dyn ObjectStore>));
    let response = worker
        .handle(&job(json!({
            "workflow": workflow(),
            "images": [{"name": "a.png", "image": encode_bytes(b"input-pixels")}]
        })))
        .await;

    let JobResponse::Completed(envelope) = response else { panic!("unexpected response variant") };
    assert_eq!(envelope.report.status, Status::Success);
    let results = envelope.report.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].image, "https://renders.example.com/job-1/ComfyUI_00001_.png");
    assert_eq!(*store.keys.lock().unwrap(), ["job-1/ComfyUI_00001_.png"]);
}

/// The refresh flag from configuration is copied into the envelope.
#[tokio::test]
async fn refresh_flag_is_attached() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();
    tokio::fs::write(output.path().join("out.png"), b"x").await.unwrap();

    let _ready = mock_ready(&mut server).await;
    let _queue = mock_queue(&mut server).await;
    let _history = mock_history(&mut server, one_image_history("out.png")).await;

    let mut conf = config(&server, output.path());
    conf.refresh_worker = true;
    let response = Worker::with_store(conf, None).handle(&job(json!({"workflow": workflow()}))).await;

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["refresh_worker"], true);
}

/// A readiness probe that never sees a 200 is not fatal; the job carries on.
#[tokio::test]
async fn probe_timeout_does_not_stop_the_job() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();
    tokio::fs::write(output.path().join("out.png"), b"x").await.unwrap();

    let probe = server.mock("GET", "/").with_status(503).expect(3).create_async().await;
    let queue = mock_queue(&mut server).await;
    let _history = mock_history(&mut server, one_image_history("out.png")).await;

    let response = Worker::with_store(config(&server, output.path()), None)
        .handle(&job(json!({"workflow": workflow()})))
        .await;

    assert!(response.is_success());
    probe.assert_async().await;
    queue.assert_async().await;
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Validation failures return before any request reaches the backend.
#[tokio::test]
async fn missing_workflow_makes_no_requests() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();
    let probe = server.mock("GET", "/").with_status(200).expect(0).create_async().await;
    let upload = server.mock("POST", "/upload/image").expect(0).create_async().await;
    let queue = server.mock("POST", "/prompt").expect(0).create_async().await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker
        .handle(&job(json!({"images": [{"name": "a.png", "image": "aGk="}]})))
        .await;

    assert_eq!(response, JobResponse::failed("Missing 'workflow' parameter"));
    probe.assert_async().await;
    upload.assert_async().await;
    queue.assert_async().await;
}

/// Malformed image entries are rejected before any upload.
#[tokio::test]
async fn malformed_images_make_no_uploads() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();
    let upload = server.mock("POST", "/upload/image").expect(0).create_async().await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker
        .handle(&job(json!({"workflow": workflow(), "images": [{"name": "a.png"}]})))
        .await;

    assert_eq!(
        response,
        JobResponse::failed("'images' must be a list of objects with 'name' and 'image' keys")
    );
    upload.assert_async().await;
}

/// A generated file that is not on disk produces an error envelope naming
/// the path.
#[tokio::test]
async fn missing_output_file_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();

    let _ready = mock_ready(&mut server).await;
    let _queue = mock_queue(&mut server).await;
    let _history = mock_history(&mut server, one_image_history("ComfyUI_00001_.png")).await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker.handle(&job(json!({"workflow": workflow()}))).await;

    let JobResponse::Completed(envelope) = response else { panic!("unexpected response variant") };
    assert_eq!(envelope.report.status, Status::Error);
    assert!(!envelope.refresh_worker);
    let missing = output.path().join("ComfyUI_00001_.png").display().to_string();
    let Message::Text(message) = &envelope.report.message else { panic!("expected a text message") };
    assert!(message.contains(&missing), "{message}");
    assert!(envelope.report.errors.unwrap().iter().any(|e| e.contains(&missing)));
}

/// A backend that never reports outputs ends in an error mapping, not a panic.
#[tokio::test]
async fn poll_budget_exhaustion_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();

    let _ready = mock_ready(&mut server).await;
    let _queue = mock_queue(&mut server).await;
    let history = server
        .mock("GET", format!("/history/{}", PROMPT_ID).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(5)
        .create_async()
        .await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker.handle(&job(json!({"workflow": workflow()}))).await;

    assert_eq!(response, JobResponse::failed("Max retries reached while waiting for image generation"));
    history.assert_async().await;
}

/// A history endpoint failure stops polling immediately.
#[tokio::test]
async fn history_failure_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();

    let _ready = mock_ready(&mut server).await;
    let _queue = mock_queue(&mut server).await;
    let history = server
        .mock("GET", format!("/history/{}", PROMPT_ID).as_str())
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker.handle(&job(json!({"workflow": workflow()}))).await;

    let JobResponse::Failed { error } = response else { panic!("unexpected response variant") };
    assert!(error.starts_with("Error waiting for image generation:"), "{error}");
    history.assert_async().await;
}

/// A rejected upload returns the upload report and never queues the workflow.
#[tokio::test]
async fn failed_upload_stops_the_job() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();

    let _ready = mock_ready(&mut server).await;
    let _mock = server.mock("POST", "/upload/image").with_status(400).with_body("bad image").create_async().await;
    let queue = server.mock("POST", "/prompt").expect(0).create_async().await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker
        .handle(&job(json!({
            "workflow": workflow(),
            "images": [{"name": "a.png", "image": "aGk="}, {"name": "b.png", "image": "aGk="}]
        })))
        .await;

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["status"], "error");
    assert_eq!(value["message"], "Some images failed to upload");
    assert_eq!(value["details"].as_array().unwrap().len(), 2);
    queue.assert_async().await;
}

/// A submission rejected by ComfyUI surfaces as a queue error.
#[tokio::test]
async fn rejected_workflow_is_a_queue_error() {
    let mut server = mockito::Server::new_async().await;
    let output = tempfile::tempdir().unwrap();

    let _ready = mock_ready(&mut server).await;
    let _mock = server
        .mock("POST", "/prompt")
        .with_status(400)
        .with_body(r#"{"error": {"type": "prompt_no_outputs"}}"#)
        .create_async()
        .await;

    let worker = Worker::with_store(config(&server, output.path()), None);
    let response = worker.handle(&job(json!({"workflow": workflow()}))).await;

    let JobResponse::Failed { error } = response else { panic!("unexpected response variant") };
    assert!(error.starts_with("Error queuing workflow:"), "{error}");
    assert!(error.contains("prompt_no_outputs"));
}

/// An unreachable backend does not fail the probe stage; the job fails at
/// submission instead.
#[tokio::test]
async fn unreachable_backend_fails_at_submission() {
    let output = tempfile::tempdir().unwrap();
    let conf = Config {
        comfy_host: "127.0.0.1:9".into(),
        availability: RetryPolicy::new(0, 2),
        polling: RetryPolicy::new(0, 2),
        output_path: output.path().to_path_buf(),
        ..Config::default()
    };

    let response = Worker::with_store(conf, None).handle(&job(json!({"workflow": workflow()}))).await;
    let JobResponse::Failed { error } = response else { panic!("unexpected response variant") };
    assert!(error.starts_with("Error queuing workflow:"));
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use base64::{engine::general_purpose, Engine as _};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use fauna_gateway::api::routes::create_router;
use fauna_gateway::engine::PredictionEngine;
use fauna_gateway::gateway::Gateway;
use fauna_gateway::model::{InstanceBatch, PredictionBatch, PredictionRecord};

/// Engine stand-in: records every batch it receives and echoes one
/// successful record per submitted path. Cloned handles share state so a
/// test can inspect what the gateway actually sent.
#[derive(Clone)]
struct CaptureEngine {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<InstanceBatch>>>,
    fail: bool,
}

impl CaptureEngine {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

#[async_trait::async_trait]
impl PredictionEngine for CaptureEngine {
    async fn predict(&self, batch: &InstanceBatch) -> anyhow::Result<PredictionBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(batch.clone());
        if self.fail {
            anyhow::bail!("model exploded");
        }
        let predictions = batch
            .instances
            .iter()
            .map(|instance| {
                assert!(
                    std::path::Path::new(&instance.filepath).exists()
                        || !instance.filepath.contains(std::path::MAIN_SEPARATOR),
                    "backing file missing during engine call: {}",
                    instance.filepath
                );
                let mut record = PredictionRecord::new(instance.filepath.clone());
                record.prediction = Some("loxodonta africana".to_string());
                record.prediction_score = Some(0.93);
                record.prediction_source = Some("classifier".to_string());
                record
            })
            .collect();
        Ok(PredictionBatch { predictions })
    }

    fn model_name(&self) -> &str {
        "test-model"
    }
}

struct TestServer {
    app: axum::Router,
    engine: CaptureEngine,
    scratch: tempfile::TempDir,
}

impl TestServer {
    fn new(engine: CaptureEngine, extra_fields: Vec<String>) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let gateway = Gateway::new(
            engine.clone(),
            extra_fields,
            scratch.path().to_path_buf(),
        )
        .unwrap();
        let app = create_router().with_state(Arc::new(gateway));
        Self {
            app,
            engine,
            scratch,
        }
    }

    async fn post_json(&self, path: &str, body: Value) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, path: &str) -> Response {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    fn scratch_file_count(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 80, 40]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

const BOUNDARY: &str = "fauna-test-boundary";

fn multipart_body(files: &[(&str, &str, &[u8])], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn health_reports_configured_model() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());

    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "test-model");
}

#[tokio::test]
async fn predict_propagates_declared_extra_fields() {
    let server = TestServer::new(CaptureEngine::new(), vec!["extra1".to_string()]);

    let response = server
        .post_json(
            "/predict",
            json!({
                "instances": [
                    {"filepath": "a.jpg", "country": "KEN", "extra1": "x", "extra2": "y"}
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0]["filepath"], "a.jpg");
    assert_eq!(predictions[0]["prediction"], "loxodonta africana");
    // Declared field re-attached even though the engine never echoed it;
    // undeclared field dropped.
    assert_eq!(predictions[0]["extra1"], "x");
    assert!(predictions[0].get("extra2").is_none());

    // The engine saw the caller's metadata on the canonical instance.
    let seen = server.engine.seen.lock();
    assert_eq!(seen[0].instances[0].country.as_deref(), Some("KEN"));
}

#[tokio::test]
async fn predict_rejects_missing_filepath_without_calling_engine() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());

    let response = server
        .post_json(
            "/predict",
            json!({"instances": [{"filepath": "a.jpg"}, {"country": "KEN"}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["category"], "validation");
    assert!(body["error"].as_str().unwrap().contains("filepath"));
    assert_eq!(server.engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn predict_rejects_duplicate_paths_in_a_batch() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());

    let response = server
        .post_json(
            "/predict",
            json!({"instances": [{"filepath": "dup.jpg"}, {"filepath": "dup.jpg"}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["category"], "validation");
    assert!(body["error"].as_str().unwrap().contains("dup.jpg"));
    assert_eq!(server.engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn predict_surfaces_engine_failure_as_bad_gateway() {
    let server = TestServer::new(CaptureEngine::failing(), Vec::new());

    let response = server
        .post_json("/predict", json!({"instances": [{"filepath": "a.jpg"}]}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = response_json(response).await;
    assert_eq!(body["category"], "engine");
    assert!(body["error"].as_str().unwrap().contains("model exploded"));
}

#[tokio::test]
async fn predict_base64_round_trips_and_cleans_up() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());
    let payload = general_purpose::STANDARD.encode(png_bytes());

    let response = server
        .post_json(
            "/predict_base64",
            json!({"instances": [{"image_data": payload, "country": "KEN", "latitude": -1.28}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["predictions"].as_array().unwrap().len(), 1);

    // Per-record metadata made it onto the canonical instance.
    {
        let seen = server.engine.seen.lock();
        assert_eq!(seen[0].instances[0].country.as_deref(), Some("KEN"));
        assert_eq!(seen[0].instances[0].latitude, Some(-1.28));
    }
    // No temp file survives the handler.
    assert_eq!(server.scratch_file_count(), 0);
}

#[tokio::test]
async fn predict_base64_rejects_bad_payloads_and_cleans_up() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());

    let response = server
        .post_json(
            "/predict_base64",
            json!({"instances": [{"image_data": "@@not-base64@@"}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["category"], "decode");
    assert_eq!(server.engine.calls.load(Ordering::SeqCst), 0);
    assert_eq!(server.scratch_file_count(), 0);
}

#[tokio::test]
async fn predict_base64_cleans_up_when_the_engine_fails() {
    let server = TestServer::new(CaptureEngine::failing(), Vec::new());
    let payload = general_purpose::STANDARD.encode(png_bytes());

    let response = server
        .post_json(
            "/predict_base64",
            json!({"instances": [{"image_data": payload}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(server.scratch_file_count(), 0);
}

#[tokio::test]
async fn predict_upload_applies_form_metadata_to_every_file() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());
    let png = png_bytes();
    let body = multipart_body(
        &[
            ("one.png", "image/png", &png),
            ("two.png", "image/png", &png),
        ],
        &[
            ("country", "USA"),
            ("latitude", "37.7749"),
            ("longitude", "-122.4194"),
        ],
    );

    let request = Request::builder()
        .method("POST")
        .uri("/predict_upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_body = response_json(response).await;
    let predictions = json_body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_ne!(predictions[0]["filepath"], predictions[1]["filepath"]);

    // Batch-wide form fields landed on every canonical instance, and each
    // instance got its own generated path.
    {
        let seen = server.engine.seen.lock();
        let instances = &seen[0].instances;
        assert_eq!(instances.len(), 2);
        assert_ne!(instances[0].filepath, instances[1].filepath);
        for instance in instances {
            assert_eq!(instance.country.as_deref(), Some("USA"));
            assert_eq!(instance.latitude, Some(37.7749));
            assert_eq!(instance.longitude, Some(-122.4194));
        }
    }
    assert_eq!(server.scratch_file_count(), 0);
}

#[tokio::test]
async fn predict_upload_rejects_non_image_parts() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());
    let body = multipart_body(&[("notes.txt", "text/plain", b"hello")], &[]);

    let request = Request::builder()
        .method("POST")
        .uri("/predict_upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let json_body = response_json(response).await;
    assert_eq!(json_body["category"], "unsupported_media");
    assert_eq!(server.engine.calls.load(Ordering::SeqCst), 0);
    assert_eq!(server.scratch_file_count(), 0);
}

#[tokio::test]
async fn predict_upload_requires_at_least_one_file() {
    let server = TestServer::new(CaptureEngine::new(), Vec::new());
    let body = multipart_body(&[], &[("country", "USA")]);

    let request = Request::builder()
        .method("POST")
        .uri("/predict_upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json_body = response_json(response).await;
    assert_eq!(json_body["category"], "validation");
    assert!(json_body["error"].as_str().unwrap().contains("files"));
}

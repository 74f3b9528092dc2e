//! Axum route handler for the extraction endpoint.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::errors::{AppError, NO_FILE_PART, NO_SELECTED_FILE, UNSUPPORTED_FORMAT};
use crate::extraction::{extract_text, DocumentFormat};
use crate::jd::normalizer::normalize;
use crate::jd::prompts::build_extraction_prompt;
use crate::llm_client::generate_or_none;
use crate::state::AppState;

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub data: Value,
}

/// One uploaded file part. Lives for the duration of the request.
struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

/// POST /extract
///
/// Multipart upload of a `.pdf` or `.docx` job description under the `file` field.
/// Returns the model's structured extraction as `{"data": {...}}`.
pub async fn handle_extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, AppError> {
    // A body that is not multipart at all has no file part either.
    let mut multipart = multipart.map_err(|_| AppError::Validation(NO_FILE_PART.to_string()))?;

    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::Validation(NO_FILE_PART.to_string()))?;

    if upload.filename.is_empty() {
        return Err(AppError::Validation(NO_SELECTED_FILE.to_string()));
    }

    let format = DocumentFormat::from_filename(&upload.filename)
        .ok_or_else(|| AppError::Validation(UNSUPPORTED_FORMAT.to_string()))?;

    let text = extract_text(format, upload.bytes).await?;
    info!(
        "Extracted {} chars from {:?} upload '{}'",
        text.len(),
        format,
        upload.filename
    );

    let prompt = build_extraction_prompt(&text);
    let raw = generate_or_none(state.generator.as_ref(), &prompt)
        .await
        .ok_or(AppError::Generation)?;

    let data = normalize(&raw)?;

    Ok(Json(ExtractResponse { data }))
}

/// Returns the first `file` part that carries a `filename` parameter. Plain form
/// fields, including one named `file`, are skipped. An empty filename is kept.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok(Some(UploadedFile { filename, bytes }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::extraction::docx::tests::build_docx;
    use crate::extraction::pdf::tests::build_pdf;
    use crate::llm_client::{LlmError, TextGenerator};
    use crate::routes::build_router;

    const BOUNDARY: &str = "jd-extractor-test-boundary";

    /// Deterministic generator: replays a fixed reply and records prompts.
    struct StubGenerator {
        reply: Option<String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl StubGenerator {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply.clone().ok_or(LlmError::Api {
                status: 503,
                message: "stubbed outage".to_string(),
            })
        }
    }

    fn app_with(generator: Arc<StubGenerator>, config: Config) -> Router {
        build_router(AppState { generator, config })
    }

    fn app(generator: &Arc<StubGenerator>) -> Router {
        app_with(generator.clone(), Config::for_tests())
    }

    fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(name) => format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn sample_docx() -> Vec<u8> {
        build_docx(concat!(
            "<w:p><w:r><w:t>Senior Rust Engineer</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Acme Labs, Pune</w:t></w:r></w:p>",
        ))
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("document", Some("jd.pdf"), b"%PDF-1.4");
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No file part" }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_multipart_body_has_no_file_part() {
        let generator = StubGenerator::replying("{}");
        let request = Request::builder()
            .method("POST")
            .uri("/extract")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(app(&generator), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No file part" }));
    }

    #[tokio::test]
    async fn test_file_field_without_filename_is_not_a_file_part() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("file", None, b"just a form value");
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No file part" }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_form_field_named_file_before_real_upload() {
        let generator = StubGenerator::replying("{\"title\":\"Engineer\"}");
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"\r\n\r\nnote\r\n");
        body.extend_from_slice(&multipart_body("file", Some("jd.docx"), &sample_docx()));
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": { "title": "Engineer" } }));
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("file", Some(""), b"anything");
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No selected file" }));
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("file", Some("resume.txt"), b"plain text");
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Unsupported file format" }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_uppercase_extension_is_unsupported() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("file", Some("JD.DOCX"), &sample_docx());
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Unsupported file format" }));
    }

    #[tokio::test]
    async fn test_docx_upload_returns_parsed_data() {
        let generator = StubGenerator::replying("```json\n{\"title\":\"Engineer\"}\n```");
        let body = multipart_body("file", Some("jd.docx"), &sample_docx());
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": { "title": "Engineer" } }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.ends_with("Job Description:\nSenior Rust Engineer\nAcme Labs, Pune"));
    }

    #[tokio::test]
    async fn test_pdf_upload_returns_parsed_data() {
        let generator = StubGenerator::replying("```json\n{\"title\":\"Data Analyst\"}\n```");
        let pdf = build_pdf(&["Data Analyst", "Mumbai Hybrid"]);
        let body = multipart_body("file", Some("jd.pdf"), &pdf);
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": { "title": "Data Analyst" } }));

        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        let document = &prompt[prompt.find("Job Description:\n").unwrap()..];
        let first = document.find("Analyst").unwrap();
        let second = document.find("Mumbai").unwrap();
        assert!(first < second);
        assert!(prompt.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_other_fields_before_file_are_skipped() {
        let generator = StubGenerator::replying("{\"title\":\"Engineer\"}");
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n");
        let file_part = multipart_body("file", Some("jd.docx"), &sample_docx());
        body.extend_from_slice(&file_part);
        let (status, _) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_json_from_model() {
        let generator = StubGenerator::replying("not json");
        let body = multipart_body("file", Some("jd.docx"), &sample_docx());
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Invalid JSON response" }));
    }

    #[tokio::test]
    async fn test_non_object_from_model_is_returned_as_data() {
        let generator = StubGenerator::replying("[\"Engineer\"]");
        let body = multipart_body("file", Some("jd.docx"), &sample_docx());
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": ["Engineer"] }));
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let generator = StubGenerator::failing();
        let body = multipart_body("file", Some("jd.docx"), &sample_docx());
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to generate response." }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_unprocessable() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("file", Some("jd.docx"), b"this is not a zip archive");
        let (status, body) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({ "error": "Failed to extract text from document" })
        );
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_unprocessable() {
        let generator = StubGenerator::replying("{}");
        let body = multipart_body("file", Some("jd.pdf"), b"not a pdf");
        let (status, _) = send(app(&generator), upload_request(body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identical_requests_yield_identical_bodies() {
        let generator = StubGenerator::replying("{\"title\":\"Engineer\",\"skills\":[\"Rust\"]}");
        let first = send(
            app(&generator),
            upload_request(multipart_body("file", Some("jd.docx"), &sample_docx())),
        )
        .await;
        let second = send(
            app(&generator),
            upload_request(multipart_body("file", Some("jd.docx"), &sample_docx())),
        )
        .await;

        assert_eq!(first, second);
        assert_eq!(first.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected_before_generation() {
        let generator = StubGenerator::replying("{}");
        let config = Config {
            max_upload_bytes: 128,
            ..Config::for_tests()
        };
        let body = multipart_body("file", Some("jd.docx"), &vec![b'x'; 4096]);
        let response = app_with(generator.clone(), config)
            .oneshot(upload_request(body))
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::OK);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health() {
        let generator = StubGenerator::replying("{}");
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&generator), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jd-extractor");
    }
}

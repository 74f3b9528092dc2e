use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractError;
use crate::jd::normalizer::NormalizeError;

pub const NO_FILE_PART: &str = "No file part";
pub const NO_SELECTED_FILE: &str = "No selected file";
pub const UNSUPPORTED_FORMAT: &str = "Unsupported file format";
pub const GENERATION_FAILED: &str = "Failed to generate response.";
pub const INVALID_JSON: &str = "Invalid JSON response";
pub const PROCESSING_FAILED: &str = "Response processing error";
pub const EXTRACTION_FAILED: &str = "Failed to extract text from document";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Generation produced no result")]
    Generation,

    #[error("Invalid JSON in model response: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Response processing error: {0}")]
    Processing(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => {
                tracing::debug!("Rejected upload: {msg}");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Multipart(e) => {
                tracing::debug!("Unreadable multipart body: {e}");
                (e.status(), e.body_text())
            }
            AppError::Extraction(e) => {
                tracing::warn!("Text extraction failed: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    EXTRACTION_FAILED.to_string(),
                )
            }
            // Already logged at the generation boundary.
            AppError::Generation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERATION_FAILED.to_string(),
            ),
            AppError::InvalidJson(e) => {
                tracing::error!("Error decoding JSON from model response: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, INVALID_JSON.to_string())
            }
            AppError::Processing(msg) => {
                tracing::error!("Error processing model response: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    PROCESSING_FAILED.to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::InvalidJson(e) => AppError::InvalidJson(e),
            NormalizeError::Processing(msg) => AppError::Processing(msg),
        }
    }
}

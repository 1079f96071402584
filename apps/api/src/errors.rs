use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::assessment::generator::McqError;
use crate::assessment::session::SessionError;
use crate::llm_client::LlmError;
use crate::matching::extractor::ExtractionError;
use crate::store::documents::DocumentError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Every missing required field, reported together.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("Password protected document")]
    PasswordProtected,

    #[error("AI provider not configured: {0}")]
    ServiceUnavailable(&'static str),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Hint returned with 503 responses for AI-backed endpoints.
pub const PROVIDER_HINT: &str = "Set OPENAI_API_KEY to enable AI features";

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::UnsupportedFileType(mime) => AppError::UnsupportedFileType(mime),
            ExtractionError::UnsupportedDocument(reason) => AppError::UnsupportedDocument(reason),
            ExtractionError::PasswordProtected => AppError::PasswordProtected,
        }
    }
}

impl From<McqError> for AppError {
    fn from(e: McqError) -> Self {
        match e {
            McqError::InvalidRequest(msg) => AppError::Validation(msg),
            McqError::GenerationFailed(msg) => AppError::GenerationFailed(msg),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::GenerationFailed(e.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Internal(e.into())
    }
}

impl AppError {
    pub(crate) fn parts(&self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
                Some(json!({ "missingFields": fields })),
            ),
            AppError::UnsupportedFileType(mime) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNSUPPORTED_FILE_TYPE",
                format!("Unsupported file type '{mime}'. Upload a PDF, DOC or DOCX file."),
                None,
            ),
            AppError::UnsupportedDocument(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNSUPPORTED_DOCUMENT",
                format!("The resume could not be read ({reason}). Try converting it to DOCX or PDF."),
                None,
            ),
            AppError::PasswordProtected => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PASSWORD_PROTECTED",
                "The resume is password protected. Remove the protection and upload it again."
                    .to_string(),
                None,
            ),
            AppError::ServiceUnavailable(feature) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AI_NOT_CONFIGURED",
                format!("{feature} is unavailable because the AI provider is not configured"),
                Some(json!({ "hint": PROVIDER_HINT })),
            ),
            AppError::GenerationFailed(msg) => {
                tracing::error!("Generation failed: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "The AI provider did not return a usable result. Please try again.".to_string(),
                    None,
                )
            }
            AppError::Persistence(e) => persistence_parts(e),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "The resume could not be stored".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        }
    }
}

fn persistence_parts(e: &StoreError) -> (StatusCode, &'static str, String, Option<Value>) {
    match e {
        StoreError::Duplicate(_) => (
            StatusCode::CONFLICT,
            "DUPLICATE",
            "An application with these details already exists".to_string(),
            None,
        ),
        StoreError::ForeignKey(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_REFERENCE",
            "The referenced record no longer exists".to_string(),
            None,
        ),
        StoreError::MissingSchema(msg) => {
            tracing::error!("Database schema missing: {msg}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SCHEMA_MISSING",
                "The database is not initialized".to_string(),
                None,
            )
        }
        other => {
            tracing::error!("Persistence error: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                "The record could not be saved. Please try again.".to_string(),
                None,
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

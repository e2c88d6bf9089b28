use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::extraction::ExtractError;
use crate::llm_client::LlmError;
use crate::render::IndexPage;

pub const MISSING_INPUT_MESSAGE: &str = "Error: Resume and job posting required";
pub const NO_USABLE_TEXT_MESSAGE: &str =
    "Error: Could not extract usable text from resume or job posting was empty.";
pub const PDF_PROCESSING_MESSAGE: &str = "Error: Failed to process PDF";

/// Application-level error type.
/// Implements `IntoResponse` so handlers can return `Result<T, AppError>`; every
/// variant renders the index page with a short message in the result area.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Resume and job posting required")]
    MissingInput,

    #[error("Could not read upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("No usable resume text or empty job posting")]
    NoUsableText,

    #[error("PDF processing error: {0}")]
    PdfProcessing(#[from] ExtractError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status code and the message shown to the user.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::MissingInput => (StatusCode::BAD_REQUEST, MISSING_INPUT_MESSAGE.to_string()),
            AppError::Upload(e) => {
                tracing::warn!("Upload error: {e}");
                (e.status(), "Error: Could not read the uploaded form".to_string())
            }
            AppError::NoUsableText => {
                (StatusCode::BAD_REQUEST, NO_USABLE_TEXT_MESSAGE.to_string())
            }
            AppError::PdfProcessing(e) => {
                tracing::error!("PDF processing error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    PDF_PROCESSING_MESSAGE.to_string(),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("LLM Error: {}", e.user_message()),
                )
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error: Could not render the page".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error: An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        match IndexPage::error(&message).to_html() {
            Ok(page) => (status, page).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {e}");
                (status, message).into_response()
            }
        }
    }
}

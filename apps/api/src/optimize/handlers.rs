//! Axum route handlers for the upload page.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Html,
};
use bytes::Bytes;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::optimize::prompts::build_optimize_prompt;
use crate::render::IndexPage;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";
const JOB_POSTING_FIELD: &str = "job_posting";

#[derive(Debug)]
struct OptimizeForm {
    resume: Bytes,
    job_posting: String,
}

/// GET /
pub async fn handle_index() -> Result<Html<String>, AppError> {
    Ok(IndexPage::form().to_html()?)
}

/// POST /optimize_resume
///
/// Extract → prompt → complete. Missing or unusable input is a 400; PDF and
/// upstream failures are a 500. Both render the page with a message.
pub async fn handle_optimize_resume(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, AppError> {
    let request_id = Uuid::new_v4();
    optimize(state, multipart)
        .instrument(info_span!("optimize_resume", %request_id))
        .await
}

async fn optimize(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, AppError> {
    let multipart = multipart.map_err(|e| {
        warn!("Rejected upload: {e}");
        AppError::MissingInput
    })?;
    let OptimizeForm {
        resume,
        job_posting,
    } = read_form(multipart).await?;
    info!(
        "Received resume ({} bytes) and job posting ({} chars)",
        resume.len(),
        job_posting.len()
    );

    // Parsing is CPU-bound; the blocking task owns the upload buffer.
    let extractor = state.extractor.clone();
    let extracted = tokio::task::spawn_blocking(move || extractor.extract(&resume))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task failed: {e}")))??;

    if job_posting.trim().is_empty() || !extracted.is_usable() {
        return Err(AppError::NoUsableText);
    }

    let prompt = build_optimize_prompt(&job_posting, extracted.as_str());
    let optimized = state.llm.complete(&prompt).await?;
    info!("Optimized resume ready ({} chars)", optimized.len());

    Ok(IndexPage::result(&optimized).to_html()?)
}

/// Reads the `resume` file and `job_posting` text; other fields are drained
/// and ignored. An empty file counts as missing.
async fn read_form(mut multipart: Multipart) -> Result<OptimizeForm, AppError> {
    let mut resume: Option<Bytes> = None;
    let mut job_posting: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            RESUME_FIELD => resume = Some(field.bytes().await?),
            JOB_POSTING_FIELD => job_posting = Some(field.text().await?),
            _ => {
                field.bytes().await?;
            }
        }
    }

    match (resume, job_posting) {
        (Some(resume), Some(job_posting)) if !resume.is_empty() => Ok(OptimizeForm {
            resume,
            job_posting,
        }),
        _ => Err(AppError::MissingInput),
    }
}

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request data; each request owns its upload bytes and prompt.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub extractor: Arc<TextExtractor>,
    pub config: Config,
}

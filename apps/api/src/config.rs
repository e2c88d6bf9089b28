use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::CompletionConfig;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub completion: CompletionConfig,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = CompletionConfig::default();

        Ok(Config {
            completion: CompletionConfig {
                endpoint: std::env::var("LLM_API_URL").unwrap_or(defaults.endpoint),
                model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
                max_tokens: parse_env("LLM_MAX_TOKENS", defaults.max_tokens)?,
                temperature: parse_env("LLM_TEMPERATURE", defaults.temperature)?,
            },
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

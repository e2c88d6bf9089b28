// Résumé optimization: multipart upload → text extraction → prompt → local LLM → rendered page.

pub mod handlers;
pub mod prompts;

//! Generation service boundary.
//!
//! [`LlmClient`] is the seam between the analysis pipeline and the hosted
//! model API: one streaming generation call, fragments delivered in order,
//! full text returned once the stream drains. [`gemini::GeminiClient`] is the
//! production implementation; [`gemini::MockLlmClient`] drives the tests.

pub mod gemini;

pub use gemini::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Cannot reach generation service at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Generation service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed stream payload: {0}")]
    StreamParsing(String),
}

/// Client for the hosted generation service.
pub trait LlmClient {
    /// Issue a generation request in streaming mode.
    ///
    /// Each text fragment is handed to `on_fragment` in arrival order, and the
    /// full accumulated text is returned once the fragment sequence is
    /// exhausted. On a mid-stream failure the error is returned and whatever
    /// was accumulated is discarded by the caller — partial output must never
    /// be persisted.
    fn generate_streaming(
        &self,
        model: &str,
        prompt: &str,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<String, LlmError>;
}

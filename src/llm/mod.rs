//! Text generation backends.
//!
//! The query runner only needs one capability from a backend: turn a prompt
//! into a list of text fragments using the caller's API key.

pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiBackend;

/// A single-shot, non-streaming text generator.
#[async_trait]
pub trait TextGenerator {
    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Send `prompt` to the model and return the content fragments in order.
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<Vec<String>>;
}

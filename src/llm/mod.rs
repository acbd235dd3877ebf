//! Client side of the hosted model: prompt construction, the Gemini REST
//! transport and parsing of its structured answers.

mod gemini;
mod parse;
mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DiagramResponse, GeneratedImage, GenerationRequest};

pub use gemini::GeminiClient;
pub use parse::{parse_diagram_json, strip_code_fences};
pub use prompt::{code_prompt, image_prompt, SYSTEM_INSTRUCTIONS};

/// Placeholder shipped in sample `.env` files; never a real key.
pub const PLACEHOLDER_API_KEY: &str = "your_google_api_key_here";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Google API key is required. Set {env_var} in the environment or a .env file.")]
    MissingApiKey { env_var: String },

    #[error("Request to model {model} failed: {source}")]
    Transport {
        model: String,
        source: reqwest::Error,
    },

    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Quota exceeded ({status}): {message}")]
    Quota { status: u16, message: String },

    #[error("Model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed model response: {0}")]
    Malformed(String),
}

/// Checks an API key taken from the environment.
pub fn validate_api_key(key: Option<&str>, env_var: &str) -> Result<String, LlmError> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() && key != PLACEHOLDER_API_KEY => Ok(key.to_string()),
        _ => Err(LlmError::MissingApiKey {
            env_var: env_var.to_string(),
        }),
    }
}

/// A model that can design a diagram, either as `diagrams` code or as an image.
#[async_trait]
pub trait DiagramAgent: Send + Sync {
    /// Model used for code generation, recorded in artifact metadata.
    fn code_model(&self) -> &str;

    /// Model used for image generation, recorded in artifact metadata.
    fn image_model(&self) -> &str;

    async fn generate_code(&self, request: &GenerationRequest) -> Result<DiagramResponse, LlmError>;

    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key(Some(" abc123 "), "GOOGLE_API_KEY").unwrap(), "abc123");

        for bad in [None, Some(""), Some("   "), Some(PLACEHOLDER_API_KEY)] {
            let err = validate_api_key(bad, "GOOGLE_API_KEY").unwrap_err();
            assert!(matches!(err, LlmError::MissingApiKey { .. }));
            assert!(err.to_string().contains("GOOGLE_API_KEY"));
        }
    }
}

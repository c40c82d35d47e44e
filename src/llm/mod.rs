pub mod models;
pub mod prompt;
pub mod providers;
pub mod sanitize;
pub mod selector;

use crate::config::LlmConfig;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API Error {status}: {body}")]
    ApiStatus { status: u16, body: String },
    #[error("No response generated")]
    NoCandidates,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Error generating query: {0}")]
    Unknown(String),
    #[error("LLM configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Unknown(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Produces a sanitized query for `question` against `schema`.
    async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

pub struct LlmManager {
    generator: Box<dyn SqlGenerator>,
}

impl LlmManager {
    /// Builds the configured backend. For Gemini this resolves the model
    /// against the provider catalog.
    pub async fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn SqlGenerator> = match config.backend.as_str() {
            "gemini" => Box::new(providers::gemini::GeminiProvider::connect(config).await?),
            _ => {
                return Err(LlmError::Config(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { generator })
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub fn generator(&self) -> &dyn SqlGenerator {
        self.generator.as_ref()
    }
}

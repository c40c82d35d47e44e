use crate::config::LlmConfig;
use crate::llm::models::{GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::llm::prompt::build_prompt;
use crate::llm::sanitize::sanitize_sql;
use crate::llm::selector::resolve_model;
use crate::llm::{LlmError, SqlGenerator};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct GeminiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    dialect: String,
    generation_config: GenerationConfig,
    request_timeout: Duration,
}

impl GeminiProvider {
    /// Creates the provider and settles on a model: the configured one if
    /// set, otherwise whatever the catalog offers.
    pub async fn connect(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::Config("API key is required for Gemini provider".to_string()))?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let api_url = config.api_url.trim_end_matches('/').to_string();

        let model = match &config.model {
            Some(model) => {
                info!("Using configured model: {}", model);
                model.clone()
            }
            None => {
                resolve_model(
                    &client,
                    &api_url,
                    &api_key,
                    Duration::from_secs(config.catalog_timeout_secs),
                    &config.preferred_models,
                    &config.default_model,
                )
                .await
            }
        };

        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            dialect: config.dialect.clone(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Sends one prompt and returns the trimmed text of the first candidate.
    pub async fn complete(&self, prompt: String) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let request = GenerateContentRequest::from_prompt(prompt, self.generation_config.clone());

        debug!("Sending request to Gemini with model: {}", self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API responded with status code: {} - {}", status, body);
            return Err(LlmError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        debug!("Raw response from Gemini: {}", response_text);

        let parsed: GenerateContentResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::Unknown(format!("Failed to parse Gemini response: {}", e))
        })?;

        if parsed.candidates.is_empty() {
            return Err(LlmError::NoCandidates);
        }

        parsed
            .first_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::Unknown("first candidate has no text part".to_string()))
    }
}

#[async_trait]
impl SqlGenerator for GeminiProvider {
    async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError> {
        let prompt = build_prompt(schema, question, &self.dialect);
        let content = self.complete(prompt).await?;
        Ok(sanitize_sql(&content))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

use crate::llm::LlmError;
use crate::llm::models::{ModelInfo, ModelList};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Capability a model must advertise to be usable for completions.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Picks a model name from the catalog.
///
/// Only models supporting `generateContent` are considered. Preferences are
/// substrings tried in order; the first catalog entry containing one wins.
/// With no preference match the first usable model is taken, and with no
/// usable model at all `default_model` is returned.
pub fn select_model(catalog: &[ModelInfo], preferences: &[String], default_model: &str) -> String {
    let available: Vec<&str> = catalog
        .iter()
        .filter(|m| m.supported_generation_methods.iter().any(|s| s == GENERATE_CONTENT))
        .map(|m| m.name.strip_prefix("models/").unwrap_or(&m.name))
        .filter(|name| !name.is_empty())
        .collect();

    for preferred in preferences {
        if let Some(name) = available.iter().find(|name| name.contains(preferred.as_str())) {
            return name.to_string();
        }
    }

    available
        .first()
        .map(|name| name.to_string())
        .unwrap_or_else(|| default_model.to_string())
}

pub async fn fetch_catalog(
    client: &reqwest::Client,
    api_url: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Vec<ModelInfo>, LlmError> {
    let url = format!("{}/models", api_url.trim_end_matches('/'));
    debug!("Fetching model catalog from {}", url);

    let response = client
        .get(&url)
        .query(&[("key", api_key)])
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiStatus {
            status: status.as_u16(),
            body,
        });
    }

    let list: ModelList = response.json().await?;
    Ok(list.models)
}

/// Resolves the model to use. Never fails: catalog problems are logged and
/// the default model is used instead.
pub async fn resolve_model(
    client: &reqwest::Client,
    api_url: &str,
    api_key: &str,
    timeout: Duration,
    preferences: &[String],
    default_model: &str,
) -> String {
    let catalog = match fetch_catalog(client, api_url, api_key, timeout).await {
        Ok(models) => models,
        Err(e) => {
            warn!("Could not fetch models list: {}", e);
            Vec::new()
        }
    };

    let model = select_model(&catalog, preferences, default_model);
    info!("Using model: {} ({} models in catalog)", model, catalog.len());
    model
}

//! Client factory — builds the configured LLM client.

use std::sync::Arc;

use opentwin_config::{AppConfig, ConfigError};
use opentwin_core::LlmClient;
use tracing::info;

use crate::anthropic::AnthropicClient;
use crate::openai_compat::OpenAiCompatClient;

/// Build the client selected by `llm.provider`.
///
/// A missing key for the selected provider is a configuration error and is
/// reported before any request is made.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let llm = &config.llm;
    let api_key = config.require_api_key()?;
    let model = llm.model();

    let client: Arc<dyn LlmClient> = match llm.provider.as_str() {
        "anthropic" => {
            let mut client = AnthropicClient::new(api_key, model).with_timeout(llm.timeout_secs);
            if let Some(url) = &llm.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        name => {
            let base_url = llm
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(name));
            Arc::new(
                OpenAiCompatClient::new(name, base_url, api_key, model)
                    .with_timeout(llm.timeout_secs),
            )
        }
    };

    info!(provider = %client.name(), model = %client.model(), "LLM client ready");
    Ok(client)
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "anthropic" => "https://api.anthropic.com".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

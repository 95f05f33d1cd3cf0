//! OpenAI-compatible chat-completion client.
//!
//! Works with OpenAI itself and any endpoint exposing
//! `/chat/completions` (OpenRouter, Groq, Ollama, ...).

use async_trait::async_trait;
use opentwin_core::{ChatMessage, LlmClient, LlmRequest, LlmResponse, ProviderError, Usage};
use serde::Deserialize;
use tracing::debug;

use crate::http;

pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: http::client(120),
        }
    }

    /// Create an OpenAI client (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Create an Ollama client. Ollama ignores the key.
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
            model,
        )
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = http::client(timeout_secs);
        self
    }

    /// Reasoning models reject an explicit temperature.
    fn accepts_temperature(model: &str) -> bool {
        !(model.contains("gpt-5") || model.contains("o1") || model.contains("o3"))
    }

    /// Newer models take `max_completion_tokens` instead of `max_tokens`.
    fn max_tokens_field(model: &str) -> &'static str {
        if model.contains("gpt-4") || model.contains("gpt-5") {
            "max_completion_tokens"
        } else {
            "max_tokens"
        }
    }

    fn build_body(&self, request: &LlmRequest) -> serde_json::Value {
        let model = request.model.as_deref().unwrap_or(&self.model);

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.extend(request.messages.iter().map(to_api_message));

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        if let Some(temperature) = request.temperature {
            if Self::accepts_temperature(model) {
                body["temperature"] = serde_json::json!(temperature);
            }
        }

        if let Some(max_tokens) = request.max_tokens {
            body[Self::max_tokens_field(model)] = serde_json::json!(max_tokens);
        }

        body
    }

    fn parse_response(api_response: ApiResponse) -> Result<LlmResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: api_response.model,
        })
    }
}

fn to_api_message(m: &ChatMessage) -> serde_json::Value {
    serde_json::json!({ "role": m.role.as_str(), "content": m.content })
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        debug!(provider = %self.name, model = %body["model"], "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(&self.name, response).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::parse_response(api_response)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(http::transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_constructor() {
        let client = OpenAiCompatClient::openai("sk-test", "gpt-4o");
        assert_eq!(client.name(), "openai");
        assert_eq!(client.model(), "gpt-4o");
        assert!(client.base_url.contains("api.openai.com"));
    }

    #[test]
    fn ollama_constructor_trims_slash() {
        let client = OpenAiCompatClient::ollama(Some("http://box:11434/v1/"), "llama3");
        assert_eq!(client.base_url, "http://box:11434/v1");
    }

    #[test]
    fn system_prompt_goes_first() {
        let client = OpenAiCompatClient::openai("sk", "gpt-3.5-turbo");
        let request = LlmRequest::new(vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi")])
            .with_system("Be brief");
        let body = client.build_body(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[test]
    fn gpt4_uses_max_completion_tokens() {
        let client = OpenAiCompatClient::openai("sk", "gpt-4o");
        let body = client.build_body(&LlmRequest::prompt("x").with_max_tokens(300).with_temperature(0.7));
        assert_eq!(body["max_completion_tokens"], 300);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn older_models_use_max_tokens() {
        let client = OpenAiCompatClient::openai("sk", "gpt-3.5-turbo");
        let body = client.build_body(&LlmRequest::prompt("x").with_max_tokens(300));
        assert_eq!(body["max_tokens"], 300);
    }

    #[test]
    fn reasoning_models_omit_temperature() {
        for model in ["gpt-5", "o1-mini", "o3"] {
            let client = OpenAiCompatClient::openai("sk", model);
            let body = client.build_body(&LlmRequest::prompt("x").with_temperature(0.3));
            assert!(body.get("temperature").is_none(), "{model} should omit temperature");
        }
    }

    #[test]
    fn request_model_overrides_client_model() {
        let client = OpenAiCompatClient::openai("sk", "gpt-4o");
        let mut request = LlmRequest::prompt("x");
        request.model = Some("gpt-4o-mini".into());
        assert_eq!(client.build_body(&request)["model"], "gpt-4o-mini");
    }

    #[test]
    fn parse_completion_response() {
        let data = r#"{"model":"gpt-4o","choices":[{"message":{"role":"assistant","content":"Hello!"}}],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let response = OpenAiCompatClient::parse_response(parsed).unwrap();
        assert_eq!(response.content, "Hello!");
        assert_eq!(response.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"model":"m","choices":[]}"#).unwrap();
        assert!(matches!(
            OpenAiCompatClient::parse_response(parsed),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}

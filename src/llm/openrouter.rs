//! OpenAI-compatible completion client (OpenRouter and friends)

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{CompletionClient, CompletionOptions, CompletionResponse};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const DEFAULT_MODEL: &str = "openai/gpt-oss-120b:free";

/// Every role reply must be machine-parseable, so the system prompt pins the
/// model to a single JSON object with no surrounding prose.
const JSON_ONLY_SYSTEM_PROMPT: &str = "You are a JSON-only assistant that MUST reply with a \
single valid JSON object without extra text.\nDo not expose analysis or chain-of-thought. \
Respond using the final JSON only.";

/// Configuration for an OpenAI-compatible API provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., "https://openrouter.ai/api/v1")
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Default model when the caller does not override one
    pub model: String,
    /// Extra headers to include in requests (e.g., X-Title, HTTP-Referer)
    pub extra_headers: Vec<(String, String)>,
}

impl ProviderConfig {
    /// Create an OpenRouter provider configuration
    pub fn openrouter(api_key: String) -> Self {
        Self {
            base_url: OPENROUTER_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            extra_headers: vec![(
                "X-Title".to_string(),
                "Adaptive Playbook".to_string(),
            )],
        }
    }

    /// Any other OpenAI-compatible endpoint
    pub fn custom(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url,
            api_key,
            model,
            extra_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Completion client for OpenRouter and other OpenAI-compatible providers
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(api_key: String) -> Self {
        Self::with_provider(ProviderConfig::openrouter(api_key))
    }

    /// Create a client with a specific provider configuration
    pub fn with_provider(provider: ProviderConfig) -> Self {
        Self {
            client: Arc::new(Client::new()),
            provider,
        }
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        let model = options.model.as_deref().unwrap_or(&self.provider.model);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: JSON_ONLY_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            extra: options.extra.clone(),
        };

        let mut req_builder = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", self.provider.api_key));
        for (key, value) in &self.provider.extra_headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }
        let response = req_builder
            .json(&request)
            .send()
            .await
            .context("Failed to send request to completion provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Completion API error ({}): {}", status, body);
        }

        let raw: Value = response
            .json()
            .await
            .context("Failed to parse completion response body")?;

        let text = raw
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(Value::as_str)
            .context("Completion response has no message content")?
            .to_string();

        debug!(model, chars = text.len(), "completion received");
        Ok(CompletionResponse {
            text,
            raw: Some(raw),
        })
    }
}

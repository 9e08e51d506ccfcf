//! Completion provider boundary
//!
//! The engine never talks to a model directly; roles call a
//! [`CompletionClient`]. Provider failures are opaque `anyhow` errors - the
//! core does not depend on provider-internal error types.

pub mod mock;
pub mod openrouter;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use mock::QueueClient;
pub use openrouter::{OpenRouterClient, ProviderConfig};

/// One completion reply: the text the role will parse, plus whatever
/// structured metadata the provider returned
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub raw: Option<Value>,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: None,
        }
    }
}

/// Per-call knobs. Typed fields for the common ones, an open map for
/// provider-specific extras.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub extra: Map<String, Value>,
}

/// Pluggable completion provider
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> anyhow::Result<CompletionResponse>;
}

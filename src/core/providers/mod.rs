//! Provider adapters: one `reqwest`-based translator per upstream dialect.
//!
//! Every adapter implements [`ProviderAdapter`] and owns its own wire
//! format; nothing above this layer ever sees a provider-specific request
//! or response shape.

pub mod anthropic;
pub mod google;
pub mod local;
pub mod openai;
mod openai_compat;
pub mod xai;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::core::types::{
    ChatRequest, ChatResponse, ChatStreamEvent, EmbeddingRequest, EmbeddingResponse,
    ModelCapabilities,
};

/// Failure modes an adapter can report. The Router and Health Monitor
/// branch on these variants (spec §4.2, §7) rather than on HTTP status
/// codes directly, so every adapter must classify its own upstream
/// response before returning.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("authentication failed for provider {provider}: {message}")]
    Authentication { provider: String, message: String },

    #[error("rate limited by provider {provider}: {message}")]
    RateLimit {
        provider: String,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("model {model} not found on provider {provider}")]
    ModelNotFound { provider: String, model: String },

    #[error("provider {provider} transport or upstream error: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} does not support {operation}")]
    UnsupportedOperation { provider: String, operation: String },

    #[error("request rejected by provider {provider}: {message}")]
    InvalidRequest { provider: String, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Authentication { provider, .. }
            | ProviderError::RateLimit { provider, .. }
            | ProviderError::ModelNotFound { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::UnsupportedOperation { provider, .. }
            | ProviderError::InvalidRequest { provider, .. } => provider,
        }
    }

    /// A short, stable token used by the Health Monitor's error-kind
    /// classifier (spec §4.6) — not the full `Display` message.
    pub fn kind_hint(&self) -> &'static str {
        match self {
            ProviderError::Authentication { .. } => "auth_error",
            ProviderError::RateLimit { .. } => "rate_limit",
            ProviderError::ModelNotFound { .. } => "model_not_found",
            ProviderError::Transport { .. } => "transport",
            ProviderError::UnsupportedOperation { .. } => "unsupported",
            ProviderError::InvalidRequest { .. } => "invalid_request",
        }
    }
}

/// A single upstream dialect translator.
///
/// Implementors hold their own `reqwest::Client`, base URL, and API key;
/// `chat`/`chat_stream`/`embed` each perform one round trip translating the
/// canonical request in, and the canonical response (or stream of events)
/// out.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identifier used in config, routing, and circuit-breaker keys.
    fn name(&self) -> &str;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatStreamEvent, ProviderError>>, ProviderError>;

    async fn embed(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let _ = request;
        Err(ProviderError::UnsupportedOperation {
            provider: self.name().to_string(),
            operation: "embeddings".to_string(),
        })
    }

    fn models(&self) -> Vec<ModelCapabilities>;

    /// Default model used when a caller names this provider without a
    /// specific model (spec §4.3 step 2/4).
    fn default_model(&self) -> &str;

    /// A cheap real upstream call used by the Reload Manager to verify a
    /// provider is reachable after a reload (spec's supplemented
    /// health-check-self-probe feature).
    async fn health_check(&self) -> Result<(), ProviderError> {
        let probe = ChatRequest {
            model: self.default_model().to_string(),
            messages: vec![crate::core::types::Message::user("ping")],
            system: None,
            max_tokens: Some(1),
            temperature: None,
            tools: vec![],
            tool_choice: None,
            stream: false,
            thinking_budget: None,
        };
        self.chat(&probe).await.map(|_| ())
    }
}

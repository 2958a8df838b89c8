//! xAI (Grok) dialect translator.
//!
//! Grok's API is wire-compatible with OpenAI's `/v1/chat/completions`;
//! this adapter only supplies its own base URL, auth, and model catalogue
//! over [`super::openai_compat`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::json;

use crate::core::types::{ChatRequest, ChatResponse, ChatStreamEvent, ModelCapabilities};

use super::openai_compat::{
    classify_http_error, handle_response, sse_frames, stream_events, transform_request,
    transform_response, transport_error,
};
use super::{ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.x.ai";

pub struct XaiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl XaiAdapter {
    pub fn new(api_key: String, base_url: Option<String>, default_model: String) -> Self {
        XaiAdapter {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
        }
    }
}

#[async_trait]
impl ProviderAdapter for XaiAdapter {
    fn name(&self) -> &str {
        "xai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = transform_request(request);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("xai", &e))?;
        let body = handle_response("xai", response).await?;
        Ok(transform_response("xai", body, uuid::Uuid::new_v4().to_string(), &self.default_model))
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatStreamEvent, ProviderError>>, ProviderError> {
        let mut body = transform_request(request);
        body["stream"] = json!(true);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("xai", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error("xai", status, &text));
        }

        let frames = sse_frames("xai", response.bytes_stream());
        Ok(stream_events(request.model.clone(), frames))
    }

    fn models(&self) -> Vec<ModelCapabilities> {
        vec![
            ModelCapabilities {
                model: "grok-2".to_string(),
                provider: "xai".to_string(),
                display_name: "Grok 2".to_string(),
                context_window: 131_072,
                max_output_tokens: Some(8192),
                supports_tools: true,
                supports_vision: false,
                supports_streaming: true,
                supports_json_mode: true,
                supports_thinking: false,
                supports_embeddings: false,
                input_cost_per_million: Some(2.0),
                output_cost_per_million: Some(10.0),
                categories: vec!["balanced".to_string()],
            },
            ModelCapabilities {
                model: "grok-2-vision".to_string(),
                provider: "xai".to_string(),
                display_name: "Grok 2 Vision".to_string(),
                context_window: 32_768,
                max_output_tokens: Some(8192),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: true,
                supports_thinking: false,
                supports_embeddings: false,
                input_cost_per_million: Some(2.0),
                output_cost_per_million: Some(10.0),
                categories: vec!["vision".to_string()],
            },
        ]
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_public_xai_base_url() {
        let adapter = XaiAdapter::new("key".to_string(), None, "grok-2".to_string());
        assert_eq!(adapter.base_url, "https://api.x.ai");
    }

    #[test]
    fn classifies_not_found_as_model_not_found() {
        let err = classify_http_error("xai", reqwest::StatusCode::NOT_FOUND, r#"{"error":{"message":"no such model"}}"#);
        assert!(matches!(err, ProviderError::ModelNotFound { .. }));
    }

    #[test]
    fn vision_model_is_the_only_one_advertising_vision_support() {
        let adapter = XaiAdapter::new("key".to_string(), None, "grok-2".to_string());
        let vision_models: Vec<_> = adapter.models().into_iter().filter(|m| m.supports_vision).collect();
        assert_eq!(vision_models.len(), 1);
        assert_eq!(vision_models[0].model, "grok-2-vision");
    }
}

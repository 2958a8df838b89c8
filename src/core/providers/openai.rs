//! OpenAI-dialect translator.
//!
//! Translation logic lives in [`super::openai_compat`], shared with the
//! xAI and local adapters, which all speak the same
//! `/v1/chat/completions` wire format (Open Question 1 in `DESIGN.md`).

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::json;

use crate::core::types::{ChatResponse, ChatStreamEvent, ModelCapabilities};

use super::openai_compat::{
    classify_http_error, handle_response, sse_frames, stream_events, transform_request,
    transform_response, transport_error,
};
use super::{ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, base_url: Option<String>, default_model: String) -> Self {
        OpenAiAdapter {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: &crate::core::types::ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = transform_request(request);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("openai", &e))?;
        let body = handle_response("openai", response).await?;
        Ok(transform_response("openai", body, uuid::Uuid::new_v4().to_string(), &self.default_model))
    }

    async fn chat_stream(
        &self,
        request: &crate::core::types::ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatStreamEvent, ProviderError>>, ProviderError> {
        let mut body = transform_request(request);
        body["stream"] = json!(true);
        body["stream_options"] = json!({ "include_usage": true });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("openai", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error("openai", status, &text));
        }

        let frames = sse_frames("openai", response.bytes_stream());
        Ok(stream_events(request.model.clone(), frames))
    }

    fn models(&self) -> Vec<ModelCapabilities> {
        vec![
            ModelCapabilities {
                model: "gpt-4o".to_string(),
                provider: "openai".to_string(),
                display_name: "GPT-4o".to_string(),
                context_window: 128_000,
                max_output_tokens: Some(16_384),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: true,
                supports_thinking: false,
                supports_embeddings: false,
                input_cost_per_million: Some(2.5),
                output_cost_per_million: Some(10.0),
                categories: vec!["balanced".to_string()],
            },
            ModelCapabilities {
                model: "gpt-4o-mini".to_string(),
                provider: "openai".to_string(),
                display_name: "GPT-4o mini".to_string(),
                context_window: 128_000,
                max_output_tokens: Some(16_384),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: true,
                supports_thinking: false,
                supports_embeddings: false,
                input_cost_per_million: Some(0.15),
                output_cost_per_million: Some(0.6),
                categories: vec!["fast".to_string()],
            },
            ModelCapabilities {
                model: "o1".to_string(),
                provider: "openai".to_string(),
                display_name: "o1".to_string(),
                context_window: 200_000,
                max_output_tokens: Some(100_000),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: false,
                supports_thinking: true,
                supports_embeddings: false,
                input_cost_per_million: Some(15.0),
                output_cost_per_million: Some(60.0),
                categories: vec!["reasoning".to_string()],
            },
        ]
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn embed(
        &self,
        request: &crate::core::types::EmbeddingRequest,
    ) -> Result<crate::core::types::EmbeddingResponse, ProviderError> {
        let body = json!({ "model": request.model, "input": request.input });
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("openai", &e))?;
        let body = handle_response("openai", response).await?;
        let embeddings = body["data"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, item)| crate::core::types::Embedding {
                index,
                vector: item["embedding"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect(),
            })
            .collect();
        Ok(crate::core::types::EmbeddingResponse {
            embeddings,
            usage: crate::core::types::Usage {
                input_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::openai_compat::message_to_openai;
    use crate::core::types::Message;

    #[test]
    fn single_text_part_collapses_to_plain_string_content() {
        let value = message_to_openai(&Message::user("hello"));
        assert_eq!(value["content"], json!("hello"));
    }

    #[test]
    fn classifies_auth_error_as_401() {
        let err = classify_http_error("openai", reqwest::StatusCode::UNAUTHORIZED, r#"{"error":{"message":"bad key"}}"#);
        assert!(matches!(err, ProviderError::Authentication { .. }));
    }
}

//! Google (Gemini) dialect translator.
//!
//! Same `reqwest`-based shape as the other adapters (Open Question 1 in
//! `DESIGN.md`); the wire format itself (`contents`/`parts`,
//! `role: "model"` for the assistant turn, `functionDeclarations`) is
//! Gemini's `generateContent` REST surface.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};

use crate::core::types::{
    ChatRequest, ChatResponse, ChatStreamEvent, ContentBlock, FinishReason, ImageSource, Lineage,
    Message, ModelCapabilities, Role, Usage,
};

use super::{ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GoogleAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl GoogleAdapter {
    pub fn new(api_key: String, base_url: Option<String>, default_model: String) -> Self {
        GoogleAdapter {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
        }
    }

    fn transform_request(&self, request: &ChatRequest) -> Value {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(message_to_google)
            .collect();
        let mut body = json!({ "contents": contents });
        let system = request
            .system
            .clone()
            .or_else(|| {
                request
                    .messages
                    .iter()
                    .find(|m| m.role == Role::System)
                    .map(Message::text)
            });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        let mut generation_config = json!({});
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(budget) = request.thinking_budget {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
        }
        if generation_config.as_object().map(|o| !o.is_empty()).unwrap_or(false) {
            body["generationConfig"] = generation_config;
        }
        if !request.tools.is_empty() {
            body["tools"] = json!([{
                "functionDeclarations": request.tools.iter().map(|t| json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })).collect::<Vec<_>>(),
            }]);
        }
        body
    }

    fn transform_response(&self, body: Value, request_id: String) -> Result<ChatResponse, ProviderError> {
        let candidate = &body["candidates"][0];
        let content = candidate["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(google_part_to_canonical)
            .collect();
        let finish_reason = match candidate["finishReason"].as_str().unwrap_or("STOP") {
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "RECITATION" => FinishReason::ContentFilter,
            _ if candidate["content"]["parts"]
                .as_array()
                .map(|parts| parts.iter().any(|p| p.get("functionCall").is_some()))
                .unwrap_or(false) =>
            {
                FinishReason::ToolUse
            }
            _ => FinishReason::Stop,
        };
        let input_tokens = body["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32;
        let output_tokens = body["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32;
        let usage = Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cache_read_tokens: body["usageMetadata"]["cachedContentTokenCount"].as_u64().unwrap_or(0) as u32,
            cache_write_tokens: 0,
            reasoning_tokens: body["usageMetadata"]["thoughtsTokenCount"].as_u64().unwrap_or(0) as u32,
        };
        Ok(ChatResponse {
            id: request_id.clone(),
            content,
            finish_reason,
            usage,
            lineage: Lineage::new("google", self.default_model.clone(), request_id),
        })
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.transform_request(request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body = handle_response(response).await?;
        self.transform_response(body, uuid::Uuid::new_v4().to_string())
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatStreamEvent, ProviderError>>, ProviderError> {
        let body = self.transform_request(request);
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, request.model, self.api_key
        );
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &text));
        }

        let mut started = false;
        let byte_stream = response.bytes_stream();
        let events = sse_frames(byte_stream).filter_map(move |frame| {
            let emit_start = !started;
            started = true;
            async move {
                let frame = frame.ok()?;
                let value: Value = serde_json::from_str(&frame).ok()?;
                if emit_start {
                    return Some(Ok(ChatStreamEvent::Start {
                        id: uuid::Uuid::new_v4().to_string(),
                        model: value["modelVersion"].as_str().unwrap_or_default().to_string(),
                    }));
                }
                let candidate = &value["candidates"][0];
                if let Some(reason) = candidate["finishReason"].as_str() {
                    let finish_reason = match reason {
                        "MAX_TOKENS" => FinishReason::Length,
                        "SAFETY" | "RECITATION" => FinishReason::ContentFilter,
                        _ => FinishReason::Stop,
                    };
                    let usage = Usage {
                        input_tokens: value["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32,
                        output_tokens: value["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
                        ..Usage::default()
                    };
                    return Some(Ok(ChatStreamEvent::Stop { finish_reason, usage }));
                }
                let part = &candidate["content"]["parts"][0];
                if let Some(text) = part["text"].as_str() {
                    return Some(Ok(ChatStreamEvent::Content { delta: text.to_string() }));
                }
                if let Some(call) = part.get("functionCall") {
                    return Some(Ok(ChatStreamEvent::ToolCall {
                        id: uuid::Uuid::new_v4().to_string(),
                        name: call["name"].as_str().unwrap_or_default().to_string(),
                        arguments: call["args"].clone(),
                    }));
                }
                None
            }
        });
        Ok(Box::pin(events))
    }

    fn models(&self) -> Vec<ModelCapabilities> {
        vec![
            ModelCapabilities {
                model: "gemini-1.5-pro".to_string(),
                provider: "google".to_string(),
                display_name: "Gemini 1.5 Pro".to_string(),
                context_window: 2_000_000,
                max_output_tokens: Some(8192),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: true,
                supports_thinking: false,
                supports_embeddings: true,
                input_cost_per_million: Some(1.25),
                output_cost_per_million: Some(5.0),
                categories: vec!["long-context".to_string()],
            },
            ModelCapabilities {
                model: "gemini-2.0-flash".to_string(),
                provider: "google".to_string(),
                display_name: "Gemini 2.0 Flash".to_string(),
                context_window: 1_000_000,
                max_output_tokens: Some(8192),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: true,
                supports_thinking: true,
                supports_embeddings: true,
                input_cost_per_million: Some(0.1),
                output_cost_per_million: Some(0.4),
                categories: vec!["fast".to_string(), "reasoning".to_string()],
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
        let url = format!(
            "{}/v1beta/models/{}:batchEmbedContents?key={}",
            self.base_url, request.model, self.api_key
        );
        let body = json!({
            "requests": request.input.iter().map(|text| json!({
                "model": format!("models/{}", request.model),
                "content": { "parts": [{ "text": text }] },
            })).collect::<Vec<_>>(),
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body = handle_response(response).await?;
        let embeddings = body["embeddings"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, item)| crate::core::types::Embedding {
                index,
                vector: item["values"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect(),
            })
            .collect();
        Ok(crate::core::types::EmbeddingResponse { embeddings, usage: Usage::default() })
    }
}

fn message_to_google(message: &Message) -> Value {
    let role = match message.role {
        Role::Assistant => "model",
        _ => "user",
    };
    let parts: Vec<Value> = message
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(json!({ "text": text })),
            ContentBlock::Image { media_type, data } => match data {
                ImageSource::Base64(data) => Some(json!({
                    "inlineData": { "mimeType": media_type, "data": data },
                })),
                ImageSource::Url(_) => None,
            },
            ContentBlock::ToolUse { name, input, .. } => {
                Some(json!({ "functionCall": { "name": name, "args": input } }))
            }
            ContentBlock::ToolResult { content, .. } => Some(json!({
                "functionResponse": { "name": "tool", "response": { "content": content } },
            })),
            ContentBlock::Thinking { .. } => None,
        })
        .collect();
    json!({ "role": role, "parts": parts })
}

fn google_part_to_canonical(part: Value) -> Option<ContentBlock> {
    if let Some(text) = part["text"].as_str() {
        return Some(ContentBlock::Text { text: text.to_string() });
    }
    if let Some(call) = part.get("functionCall") {
        return Some(ContentBlock::ToolUse {
            id: uuid::Uuid::new_v4().to_string(),
            name: call["name"].as_str().unwrap_or_default().to_string(),
            input: call["args"].clone(),
        });
    }
    None
}

async fn handle_response(response: reqwest::Response) -> Result<Value, ProviderError> {
    let status = response.status();
    if status.is_success() {
        response.json::<Value>().await.map_err(|e| transport_error(&e))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(classify_http_error(status, &text))
    }
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication { provider: "google".to_string(), message },
        404 => ProviderError::ModelNotFound { provider: "google".to_string(), model: message },
        429 => ProviderError::RateLimit { provider: "google".to_string(), message, retry_after_secs: None },
        400 => ProviderError::InvalidRequest { provider: "google".to_string(), message },
        _ => ProviderError::Transport { provider: "google".to_string(), message },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn transport_error(error: &reqwest::Error) -> ProviderError {
    ProviderError::Transport { provider: "google".to_string(), message: error.to_string() }
}

fn sse_frames(
    bytes: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> BoxStream<'static, Result<String, ProviderError>> {
    let state = String::new();
    Box::pin(stream::unfold((bytes, state), |(mut bytes, mut buf)| async move {
        loop {
            if let Some(pos) = buf.find('\n') {
                let line = buf[..pos].to_string();
                buf.drain(..pos + 1);
                if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
                    let data = data.trim();
                    if data.is_empty() {
                        continue;
                    }
                    return Some((Ok(data.to_string()), (bytes, buf)));
                }
                continue;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => buf.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(e)) => return Some((Err(transport_error(&e)), (bytes, buf))),
                None => return None,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_role_maps_to_model() {
        let value = message_to_google(&Message::assistant("hi"));
        assert_eq!(value["role"], json!("model"));
    }
}

//! Anthropic-dialect translator.
//!
//! Grounded on the teacher's `core/providers/anthropic/client.rs` for
//! transport shape (headers, `send_request`/`send_stream_request`,
//! `map_http_error`) and on `original_source/aratta/providers/anthropic/adapter.py`
//! for the exact wire fields this dialect expects.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};

use crate::core::types::{
    ChatRequest, ChatResponse, ChatStreamEvent, ContentBlock, FinishReason, ImageSource, Lineage,
    Message, ModelCapabilities, Role, Usage,
};

use super::{ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const THINKING_BETA_HEADER: &str = "output-128k-2025-02-19";
/// Anthropic requires a `thinking.budget_tokens` floor; below this the API
/// rejects the request outright.
const MIN_THINKING_BUDGET: u32 = 1024;

pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: String, base_url: Option<String>, default_model: String) -> Self {
        AnthropicAdapter {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
        }
    }

    fn headers(&self, streaming: bool, thinking: bool) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", self.api_key.parse().unwrap());
        headers.insert("anthropic-version", API_VERSION.parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        if thinking {
            headers.insert("anthropic-beta", THINKING_BETA_HEADER.parse().unwrap());
        }
        if streaming {
            headers.insert("accept", "text/event-stream".parse().unwrap());
        }
        headers
    }

    fn transform_request(&self, request: &ChatRequest) -> Value {
        let (system, messages) = separate_system(request);
        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(4096),
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if !request.tools.is_empty() {
            body["tools"] = json!(
                request
                    .tools
                    .iter()
                    .map(|t| json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    }))
                    .collect::<Vec<_>>()
            );
        }
        // Thinking and a caller-set sampling temperature are mutually
        // exclusive upstream; thinking wins when both are present.
        if let Some(budget) = request.thinking_budget {
            body["thinking"] = json!({
                "type": "enabled",
                "budget_tokens": budget.max(MIN_THINKING_BUDGET),
            });
        } else if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if request.stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn transform_response(&self, body: Value, request_id: String) -> Result<ChatResponse, ProviderError> {
        let content = body["content"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(anthropic_block_to_canonical)
            .collect();
        let finish_reason = match body["stop_reason"].as_str().unwrap_or("end_turn") {
            "tool_use" => FinishReason::ToolUse,
            "max_tokens" => FinishReason::Length,
            _ => FinishReason::Stop,
        };
        let input_tokens = body["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = body["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32;
        let usage = Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cache_read_tokens: body["usage"]["cache_read_input_tokens"].as_u64().unwrap_or(0) as u32,
            cache_write_tokens: body["usage"]["cache_creation_input_tokens"].as_u64().unwrap_or(0) as u32,
            reasoning_tokens: 0,
        };
        let model = body["model"].as_str().unwrap_or(&self.default_model).to_string();
        Ok(ChatResponse {
            id: body["id"].as_str().unwrap_or(&request_id).to_string(),
            content,
            finish_reason,
            usage,
            lineage: Lineage::new("anthropic", model, request_id),
        })
    }

    async fn send(&self, body: Value) -> Result<Value, ProviderError> {
        let thinking = body.get("thinking").is_some();
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(self.headers(false, thinking))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        handle_response(response).await
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.transform_request(request);
        let response = self.send(body).await?;
        self.transform_response(response, uuid::Uuid::new_v4().to_string())
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatStreamEvent, ProviderError>>, ProviderError> {
        let mut body = self.transform_request(request);
        body["stream"] = json!(true);
        let thinking = body.get("thinking").is_some();

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .headers(self.headers(true, thinking))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &text));
        }

        let byte_stream = response.bytes_stream();
        let events = sse_frames(byte_stream).filter_map(|frame| async move {
            let frame = frame.ok()?;
            anthropic_sse_to_canonical(&frame)
        });
        Ok(Box::pin(events))
    }

    fn models(&self) -> Vec<ModelCapabilities> {
        vec![
            ModelCapabilities {
                model: "claude-3-5-sonnet-20241022".to_string(),
                provider: "anthropic".to_string(),
                display_name: "Claude 3.5 Sonnet".to_string(),
                context_window: 200_000,
                max_output_tokens: Some(8192),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: false,
                supports_thinking: false,
                supports_embeddings: false,
                input_cost_per_million: Some(3.0),
                output_cost_per_million: Some(15.0),
                categories: vec!["balanced".to_string()],
            },
            ModelCapabilities {
                model: "claude-3-5-haiku-20241022".to_string(),
                provider: "anthropic".to_string(),
                display_name: "Claude 3.5 Haiku".to_string(),
                context_window: 200_000,
                max_output_tokens: Some(8192),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: false,
                supports_thinking: false,
                supports_embeddings: false,
                input_cost_per_million: Some(0.8),
                output_cost_per_million: Some(4.0),
                categories: vec!["fast".to_string()],
            },
            ModelCapabilities {
                model: "claude-3-7-sonnet-20250219".to_string(),
                provider: "anthropic".to_string(),
                display_name: "Claude 3.7 Sonnet".to_string(),
                context_window: 200_000,
                max_output_tokens: Some(64_000),
                supports_tools: true,
                supports_vision: true,
                supports_streaming: true,
                supports_json_mode: false,
                supports_thinking: true,
                supports_embeddings: false,
                input_cost_per_million: Some(3.0),
                output_cost_per_million: Some(15.0),
                categories: vec!["reasoning".to_string()],
            },
        ]
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

fn separate_system(request: &ChatRequest) -> (Option<String>, Vec<Value>) {
    let mut system = request.system.clone();
    let mut messages = Vec::new();
    for message in &request.messages {
        if message.role == Role::System {
            let text = message.text();
            system = Some(match system {
                Some(existing) => format!("{existing}\n{text}"),
                None => text,
            });
            continue;
        }
        messages.push(json!({
            "role": if message.role == Role::Tool { "user" } else { role_str(message.role) },
            "content": message.content.iter().map(canonical_block_to_anthropic).collect::<Vec<_>>(),
        }));
    }
    (system, messages)
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User | Role::Tool => "user",
        Role::Assistant => "assistant",
        Role::System => "user",
    }
}

fn canonical_block_to_anthropic(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({ "type": "text", "text": text }),
        ContentBlock::Image { media_type, data } => {
            let source = match data {
                ImageSource::Base64(data) => json!({
                    "type": "base64",
                    "media_type": media_type,
                    "data": data,
                }),
                ImageSource::Url(url) => json!({ "type": "url", "url": url }),
            };
            json!({ "type": "image", "source": source })
        }
        ContentBlock::ToolUse { id, name, input } => {
            json!({ "type": "tool_use", "id": id, "name": name, "input": input })
        }
        ContentBlock::ToolResult { tool_use_id, content, is_error } => json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
            "is_error": is_error,
        }),
        ContentBlock::Thinking { text, signature } => {
            let mut obj = json!({ "type": "thinking", "thinking": text });
            if let Some(signature) = signature {
                obj["signature"] = json!(signature);
            }
            obj
        }
    }
}

fn anthropic_block_to_canonical(block: Value) -> Option<ContentBlock> {
    match block["type"].as_str()? {
        "text" => Some(ContentBlock::Text {
            text: block["text"].as_str().unwrap_or_default().to_string(),
        }),
        "tool_use" => Some(ContentBlock::ToolUse {
            id: block["id"].as_str().unwrap_or_default().to_string(),
            name: block["name"].as_str().unwrap_or_default().to_string(),
            input: block["input"].clone(),
        }),
        "thinking" => Some(ContentBlock::Thinking {
            text: block["thinking"].as_str().unwrap_or_default().to_string(),
            signature: block["signature"].as_str().map(str::to_string),
        }),
        _ => None,
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value, ProviderError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<Value>()
            .await
            .map_err(|e| transport_error(&e))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(classify_http_error(status, &text))
    }
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication {
            provider: "anthropic".to_string(),
            message,
        },
        404 => ProviderError::ModelNotFound {
            provider: "anthropic".to_string(),
            model: message,
        },
        429 => ProviderError::RateLimit {
            provider: "anthropic".to_string(),
            message,
            retry_after_secs: None,
        },
        400 => ProviderError::InvalidRequest {
            provider: "anthropic".to_string(),
            message,
        },
        _ => ProviderError::Transport {
            provider: "anthropic".to_string(),
            message,
        },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn transport_error(error: &reqwest::Error) -> ProviderError {
    ProviderError::Transport {
        provider: "anthropic".to_string(),
        message: error.to_string(),
    }
}

/// Splits a raw SSE byte stream on blank lines into whole `data: ...`
/// frames, joining multi-line `data:` fields per the SSE spec.
fn sse_frames(
    bytes: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> BoxStream<'static, Result<String, ProviderError>> {
    let state = String::new();
    Box::pin(stream::unfold((bytes, state), |(mut bytes, mut buf)| async move {
        loop {
            if let Some(pos) = buf.find("\n\n") {
                let frame = buf[..pos].to_string();
                buf.drain(..pos + 2);
                let data = frame
                    .lines()
                    .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
                    .collect::<Vec<_>>()
                    .join("\n");
                if data.is_empty() {
                    continue;
                }
                return Some((Ok(data), (bytes, buf)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => buf.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(e)) => return Some((Err(transport_error(&e)), (bytes, buf))),
                None => return None,
            }
        }
    }))
}

fn anthropic_sse_to_canonical(frame: &str) -> Option<Result<ChatStreamEvent, ProviderError>> {
    let event: Value = serde_json::from_str(frame).ok()?;
    match event["type"].as_str()? {
        "message_start" => Some(Ok(ChatStreamEvent::Start {
            id: event["message"]["id"].as_str().unwrap_or_default().to_string(),
            model: event["message"]["model"].as_str().unwrap_or_default().to_string(),
        })),
        "content_block_delta" => {
            let delta = &event["delta"];
            match delta["type"].as_str()? {
                "text_delta" => Some(Ok(ChatStreamEvent::Content {
                    delta: delta["text"].as_str().unwrap_or_default().to_string(),
                })),
                "thinking_delta" => Some(Ok(ChatStreamEvent::Thinking {
                    delta: delta["thinking"].as_str().unwrap_or_default().to_string(),
                })),
                _ => None,
            }
        }
        "content_block_start" if event["content_block"]["type"] == "tool_use" => {
            Some(Ok(ChatStreamEvent::ToolCall {
                id: event["content_block"]["id"].as_str().unwrap_or_default().to_string(),
                name: event["content_block"]["name"].as_str().unwrap_or_default().to_string(),
                arguments: event["content_block"]["input"].clone(),
            }))
        }
        "message_delta" => {
            let stop_reason = event["delta"]["stop_reason"].as_str().unwrap_or("end_turn");
            let finish_reason = match stop_reason {
                "tool_use" => FinishReason::ToolUse,
                "max_tokens" => FinishReason::Length,
                _ => FinishReason::Stop,
            };
            let usage = Usage {
                output_tokens: event["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
                ..Usage::default()
            };
            Some(Ok(ChatStreamEvent::Stop { finish_reason, usage }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChatRequest;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new(
            "test-key".to_string(),
            None,
            "claude-3-5-sonnet-20241022".to_string(),
        )
    }

    #[test]
    fn system_messages_are_extracted_and_joined() {
        let request = ChatRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![Message::system("be terse"), Message::user("hi")],
            system: None,
            max_tokens: Some(16),
            temperature: None,
            tools: vec![],
            tool_choice: None,
            stream: false,
            thinking_budget: None,
        };
        let (system, messages) = separate_system(&request);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn thinking_budget_is_floored_and_suppresses_temperature() {
        let adapter = adapter();
        let request = ChatRequest {
            model: "claude-3-7-sonnet-20250219".to_string(),
            messages: vec![Message::user("hi")],
            system: None,
            max_tokens: Some(100),
            temperature: Some(0.9),
            tools: vec![],
            tool_choice: None,
            stream: false,
            thinking_budget: Some(16),
        };
        let body = adapter.transform_request(&request);
        assert_eq!(body["thinking"]["budget_tokens"], MIN_THINKING_BUDGET);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn classifies_rate_limit_as_429() {
        let err = classify_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"slow down"}}"#,
        );
        assert!(matches!(err, ProviderError::RateLimit { .. }));
    }
}

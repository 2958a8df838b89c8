//! Shared request/response/SSE translation for every adapter that speaks
//! the `/v1/chat/completions` wire format: OpenAI itself, xAI (Grok), and
//! any local OpenAI-compatible server (Ollama, vLLM, llama.cpp).
//!
//! Each adapter still owns its own struct, base URL, and auth header so
//! `ProviderError::provider` reports the right name — only the wire
//! translation is shared.

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};

use crate::core::types::{
    ChatRequest, ChatResponse, ChatStreamEvent, ContentBlock, FinishReason, ImageSource, Lineage,
    Message, Role, Usage,
};

use super::ProviderError;

pub fn transform_request(request: &ChatRequest) -> Value {
    let mut messages: Vec<Value> = Vec::new();
    if let Some(system) = &request.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    for message in &request.messages {
        messages.push(message_to_openai(message));
    }
    let mut body = json!({ "model": request.model, "messages": messages });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if !request.tools.is_empty() {
        body["tools"] = json!(
            request
                .tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": { "name": t.name, "description": t.description, "parameters": t.parameters },
                }))
                .collect::<Vec<_>>()
        );
    }
    body
}

pub fn message_to_openai(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut tool_call_id = None;
    let mut tool_calls = Vec::new();
    let mut parts = Vec::new();
    for block in &message.content {
        match block {
            ContentBlock::Text { text } => parts.push(json!({ "type": "text", "text": text })),
            ContentBlock::Image { data, .. } => {
                let url = match data {
                    ImageSource::Url(url) => url.clone(),
                    ImageSource::Base64(data) => data.clone(),
                };
                parts.push(json!({ "type": "image_url", "image_url": { "url": url } }));
            }
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": input.to_string() },
            })),
            ContentBlock::ToolResult { tool_use_id, content, .. } => {
                tool_call_id = Some(tool_use_id.clone());
                parts.push(json!({ "type": "text", "text": content }));
            }
            ContentBlock::Thinking { .. } => {}
        }
    }
    let mut value = json!({ "role": role });
    if parts.len() == 1 && parts[0]["text"].is_string() {
        value["content"] = parts[0]["text"].clone();
    } else if !parts.is_empty() {
        value["content"] = json!(parts);
    } else {
        value["content"] = Value::Null;
    }
    if !tool_calls.is_empty() {
        value["tool_calls"] = json!(tool_calls);
    }
    if let Some(id) = tool_call_id {
        value["tool_call_id"] = json!(id);
    }
    value
}

pub fn transform_response(provider: &str, body: Value, request_id: String, default_model: &str) -> ChatResponse {
    let choice = &body["choices"][0];
    let message = &choice["message"];
    let mut content = Vec::new();
    if let Some(text) = message["content"].as_str() {
        if !text.is_empty() {
            content.push(ContentBlock::Text { text: text.to_string() });
        }
    }
    for tool_call in message["tool_calls"].as_array().into_iter().flatten() {
        let arguments = tool_call["function"]["arguments"]
            .as_str()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or(Value::Null);
        content.push(ContentBlock::ToolUse {
            id: tool_call["id"].as_str().unwrap_or_default().to_string(),
            name: tool_call["function"]["name"].as_str().unwrap_or_default().to_string(),
            input: arguments,
        });
    }
    let finish_reason = match choice["finish_reason"].as_str().unwrap_or("stop") {
        "tool_calls" => FinishReason::ToolUse,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    };
    let usage = Usage::new(
        body["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        body["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    );
    let model = body["model"].as_str().unwrap_or(default_model).to_string();
    ChatResponse {
        id: body["id"].as_str().unwrap_or(&request_id).to_string(),
        content,
        finish_reason,
        usage,
        lineage: Lineage::new(provider, model, request_id),
    }
}

pub async fn handle_response(provider: &str, response: reqwest::Response) -> Result<Value, ProviderError> {
    let status = response.status();
    if status.is_success() {
        response.json::<Value>().await.map_err(|e| transport_error(provider, &e))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(classify_http_error(provider, status, &text))
    }
}

pub fn classify_http_error(provider: &str, status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body);
    let provider = provider.to_string();
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication { provider, message },
        404 => ProviderError::ModelNotFound { provider, model: message },
        429 => ProviderError::RateLimit { provider, message, retry_after_secs: None },
        400 => ProviderError::InvalidRequest { provider, message },
        _ => ProviderError::Transport { provider, message },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub fn transport_error(provider: &str, error: &reqwest::Error) -> ProviderError {
    ProviderError::Transport { provider: provider.to_string(), message: error.to_string() }
}

/// Turns a stream of already-unwrapped SSE `data:` payloads into canonical
/// stream events, tracking just enough state to emit one `Start` frame up
/// front and fold the terminal `finish_reason`/`usage` into the `Stop`
/// frame — OpenAI-compatible servers spread those two across every chunk.
pub fn stream_events(
    model: String,
    frames: BoxStream<'static, Result<String, ProviderError>>,
) -> BoxStream<'static, Result<ChatStreamEvent, ProviderError>> {
    let mut started = false;
    let mut final_reason = FinishReason::Stop;
    let mut final_usage = Usage::default();
    Box::pin(frames.filter_map(move |frame| {
        let model = model.clone();
        let emit_start = !started;
        started = true;
        async move {
            let frame = frame.ok()?;
            if frame == "[DONE]" {
                return Some(Ok(ChatStreamEvent::Stop { finish_reason: final_reason, usage: final_usage }));
            }
            let value: Value = serde_json::from_str(&frame).ok()?;
            if let Some(usage) = value.get("usage").filter(|u| !u.is_null()) {
                final_usage.input_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0) as u32;
                final_usage.output_tokens = usage["completion_tokens"].as_u64().unwrap_or(0) as u32;
            }
            let choice = &value["choices"][0];
            if let Some(reason) = choice["finish_reason"].as_str() {
                final_reason = match reason {
                    "tool_calls" => FinishReason::ToolUse,
                    "length" => FinishReason::Length,
                    "content_filter" => FinishReason::ContentFilter,
                    _ => FinishReason::Stop,
                };
            }
            if emit_start {
                return Some(Ok(ChatStreamEvent::Start {
                    id: value["id"].as_str().unwrap_or_default().to_string(),
                    model,
                }));
            }
            let delta = &choice["delta"];
            if let Some(tool_call) = delta["tool_calls"][0].as_object() {
                let name = tool_call["function"]["name"].as_str().unwrap_or_default();
                if name.is_empty() {
                    return None;
                }
                let arguments = tool_call["function"]["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or(Value::Null);
                return Some(Ok(ChatStreamEvent::ToolCall {
                    id: tool_call["id"].as_str().unwrap_or_default().to_string(),
                    name: name.to_string(),
                    arguments,
                }));
            }
            let content = delta["content"].as_str().unwrap_or_default();
            if content.is_empty() {
                return None;
            }
            Some(Ok(ChatStreamEvent::Content { delta: content.to_string() }))
        }
    }))
}

/// Splits a raw SSE byte stream on newlines into `data: ...` payloads.
pub fn sse_frames(
    provider: &'static str,
    bytes: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> BoxStream<'static, Result<String, ProviderError>> {
    let state = String::new();
    Box::pin(stream::unfold((bytes, state), move |(mut bytes, mut buf)| async move {
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
                Some(Err(e)) => return Some((Err(transport_error(provider, &e)), (bytes, buf))),
                None => return None,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ChatRequest, Tool};

    #[test]
    fn multi_part_content_stays_an_array() {
        let mut message = Message::user("hi");
        message.content.push(ContentBlock::text("there"));
        let value = message_to_openai(&message);
        assert!(value["content"].is_array());
    }

    #[test]
    fn tool_result_carries_its_call_id_and_flattens_to_text() {
        let message = Message {
            role: Role::Tool,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: "call_1".to_string(),
                content: "42".to_string(),
                is_error: false,
            }],
        };
        let value = message_to_openai(&message);
        assert_eq!(value["tool_call_id"], json!("call_1"));
        assert_eq!(value["content"], json!("42"));
    }

    #[test]
    fn tools_translate_to_the_function_calling_envelope() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Message::user("hi")],
            system: None,
            max_tokens: None,
            temperature: None,
            tools: vec![Tool {
                name: "get_weather".to_string(),
                description: "looks up the weather".to_string(),
                parameters: json!({"type": "object"}),
            }],
            tool_choice: None,
            stream: false,
            thinking_budget: None,
        };
        let body = transform_request(&request);
        assert_eq!(body["tools"][0]["type"], json!("function"));
        assert_eq!(body["tools"][0]["function"]["name"], json!("get_weather"));
    }

    #[test]
    fn a_done_frame_closes_the_stream_with_the_accumulated_finish_reason() {
        let frame_result: Result<String, ProviderError> = Ok("[DONE]".to_string());
        let frames: BoxStream<'static, Result<String, ProviderError>> =
            Box::pin(stream::iter(vec![frame_result]));
        let events = stream_events("gpt-4o".to_string(), frames);
        let collected: Vec<_> = futures::executor::block_on(events.collect());
        assert_eq!(collected.len(), 1);
        assert!(matches!(collected[0], Ok(ChatStreamEvent::Stop { .. })));
    }

    #[test]
    fn classifies_unmapped_status_as_transport() {
        let err = classify_http_error("openai", reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, ProviderError::Transport { .. }));
    }
}

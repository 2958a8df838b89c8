use serde::{Deserialize, Serialize};

use super::content::ContentBlock;
use super::lineage::Lineage;
use super::role::FinishReason;
use super::usage::Usage;

/// A completed chat response in the gateway's canonical dialect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub lineage: Lineage,
}

/// One streamed chat fragment. Maps 1:1 onto an SSE frame (spec §4.9):
/// `Start` opens the stream, `Content`/`Thinking` carry incremental text,
/// `ToolCall` carries a fully materialized call (providers buffer partial
/// tool-call deltas internally), `Stop` closes it with the real finish
/// reason and final usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    Start { id: String, model: String },
    Content { delta: String },
    Thinking { delta: String },
    ToolCall { id: String, name: String, arguments: serde_json::Value },
    Stop { finish_reason: FinishReason, usage: Usage },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub index: usize,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Embedding>,
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_round_trips_through_json() {
        let response = ChatResponse {
            id: "resp_1".into(),
            content: vec![ContentBlock::text("hi")],
            finish_reason: FinishReason::Stop,
            usage: Usage::new(3, 4),
            lineage: Lineage::new("anthropic", "claude-3-5-sonnet", "req_1"),
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: ChatResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, response.id);
        assert_eq!(back.finish_reason, response.finish_reason);
        assert_eq!(back.usage.total_tokens, response.usage.total_tokens);
    }

    #[test]
    fn tool_calls_present_forces_tool_use_finish_reason_on_the_wire() {
        let json = serde_json::to_string(&FinishReason::ToolUse).unwrap();
        assert_eq!(json, "\"tool_calls\"");
    }
}

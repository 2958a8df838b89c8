use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::{Tool, ToolChoice};

/// A chat completion request in the gateway's canonical dialect. Every
/// adapter's `transform_request` starts from this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Caller-facing model string, e.g. `"claude-3-5-sonnet"` or
    /// `"openai:gpt-4o"`. Resolved to a provider by the Model Resolver
    /// before an adapter ever sees it.
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default)]
    pub stream: bool,
    /// Extended-thinking token budget; `None` disables it. Mutually
    /// exclusive with a caller-set `temperature` on providers that require
    /// greedy decoding while reasoning (mirrored per-adapter, not here).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

/// An embedding request. Every adapter may reject this with
/// `ProviderError::UnsupportedOperation` (spec §4.2) — the canonical type
/// still exists so the Router has one shape to resolve against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

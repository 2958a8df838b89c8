use serde::{Deserialize, Serialize};

/// What a resolved model can do, surfaced through `GET /models` so a
/// caller can pick a model without guessing at provider-specific limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub model: String,
    pub provider: String,
    pub display_name: String,
    pub context_window: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    pub supports_tools: bool,
    pub supports_vision: bool,
    pub supports_streaming: bool,
    pub supports_json_mode: bool,
    pub supports_thinking: bool,
    pub supports_embeddings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cost_per_million: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_cost_per_million: Option<f64>,
    /// Free-form labels used only as routing hints, never interpreted by
    /// the resolver itself.
    #[serde(default)]
    pub categories: Vec<String>,
}

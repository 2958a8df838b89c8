use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One piece of a message's content.
///
/// A `Message` carries a `Vec<ContentBlock>` rather than a single string so
/// that multimodal and tool-bearing turns round-trip through every upstream
/// dialect without lossy flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// Inline image, carried as an opaque data URI or remote URL. Never
    /// decoded by the gateway — adapters forward it as-is or translate the
    /// envelope, not the bytes.
    Image {
        media_type: String,
        data: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Extended reasoning a model chose to surface. Never forwarded to
    /// logging or metrics.
    Thinking {
        text: String,
        /// Opaque upstream-provided signature, preserved verbatim and
        /// never interpreted by the gateway.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

/// Where image bytes actually live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    Url(String),
    Base64(String),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

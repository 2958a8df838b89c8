//! The canonical "gateway dialect" every adapter translates to and from.

mod capabilities;
mod content;
mod lineage;
mod message;
mod request;
mod response;
mod role;
mod tool;
mod usage;

pub use capabilities::ModelCapabilities;
pub use content::{ContentBlock, ImageSource};
pub use lineage::Lineage;
pub use message::Message;
pub use request::{ChatRequest, EmbeddingRequest};
pub use response::{ChatResponse, ChatStreamEvent, Embedding, EmbeddingResponse};
pub use role::{FinishReason, Role};
pub use tool::{Tool, ToolCall, ToolChoice};
pub use usage::Usage;

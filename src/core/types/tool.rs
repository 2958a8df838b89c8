use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition offered to the model, JSON-Schema parameters included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Value,
}

/// A model-initiated call to one of the offered tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Caller control over whether/which tool the model must invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Specific { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_round_trips_through_json() {
        let tool = Tool { name: "search".into(), description: "web search".into(), parameters: serde_json::json!({"type": "object"}) };
        let json = serde_json::to_string(&tool).unwrap();
        let back: Tool = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, tool.name);
        assert_eq!(back.description, tool.description);
        assert_eq!(back.parameters, tool.parameters);
    }

    #[test]
    fn tool_call_round_trips_through_json() {
        let call = ToolCall { id: "call_1".into(), name: "search".into(), arguments: serde_json::json!({"q": "rust"}) };
        let json = serde_json::to_string(&call).unwrap();
        let back: ToolCall = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, call.id);
        assert_eq!(back.arguments, call.arguments);
    }
}

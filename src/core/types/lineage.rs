use serde::{Deserialize, Serialize};

/// Provenance attached to a response so a caller (or the heal loop) can
/// tell which upstream actually produced it, including after a fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineage {
    pub provider: String,
    pub model: String,
    /// Set when the primary provider failed and a fallback served the
    /// request instead; names the provider that was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<String>,
    pub request_id: String,
}

impl Lineage {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, request_id: impl Into<String>) -> Self {
        Lineage {
            provider: provider.into(),
            model: model.into(),
            fallback_from: None,
            request_id: request_id.into(),
        }
    }

    pub fn with_fallback_from(mut self, original_provider: impl Into<String>) -> Self {
        self.fallback_from = Some(original_provider.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let lineage = Lineage::new("anthropic", "claude-3-5-sonnet", "req_1").with_fallback_from("openai");
        let json = serde_json::to_string(&lineage).unwrap();
        let back: Lineage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.provider, lineage.provider);
        assert_eq!(back.fallback_from, lineage.fallback_from);
    }

    #[test]
    fn fallback_from_absent_when_not_set() {
        let lineage = Lineage::new("ollama", "llama3.1:8b", "req_2");
        let json = serde_json::to_string(&lineage).unwrap();
        assert!(!json.contains("fallback_from"));
    }
}

use serde::{Deserialize, Serialize};

/// Token accounting for a single completion. Providers report these in
/// incompatible units and granularities; the gateway does not reconcile
/// them into a guaranteed-exact total (spec Non-goal).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(default)]
    pub cache_read_tokens: u32,
    #[serde(default)]
    pub cache_write_tokens: u32,
    #[serde(default)]
    pub reasoning_tokens: u32,
}

impl Usage {
    /// Builds a `Usage` from the two fields every upstream reports,
    /// keeping `total_tokens` in sync per the spec's invariant
    /// (`total == input + output` whenever all three are present).
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            ..Usage::default()
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let usage = Usage { input_tokens: 10, output_tokens: 5, total_tokens: 15, cache_read_tokens: 2, cache_write_tokens: 1, reasoning_tokens: 3 };
        let json = serde_json::to_string(&usage).unwrap();
        let back: Usage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.input_tokens, usage.input_tokens);
        assert_eq!(back.total_tokens, usage.total_tokens);
        assert_eq!(back.reasoning_tokens, usage.reasoning_tokens);
    }

    #[test]
    fn total_matches_input_plus_output_invariant() {
        let usage = Usage::new(7, 3);
        assert_eq!(usage.total_tokens, usage.input_tokens + usage.output_tokens);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let usage: Usage = serde_json::from_str("{}").unwrap();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.reasoning_tokens, 0);
    }
}

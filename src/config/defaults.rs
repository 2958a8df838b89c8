//! Built-in provider defaults and model-alias table, seeded from
//! `original_source/aratta/config.py`'s `DEFAULT_CLOUD_PROVIDERS`,
//! `DEFAULT_LOCAL_PROVIDERS`, and `DEFAULT_MODEL_ALIASES`.

use super::provider::{ProviderConfig, ProviderPriority};

pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "anthropic".to_string(),
            base_url: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            default_model: "claude-3-5-sonnet-20241022".to_string(),
            priority: ProviderPriority::Primary,
            timeout_secs: 60,
            enabled: true,
        },
        ProviderConfig {
            name: "openai".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            default_model: "gpt-4o".to_string(),
            priority: ProviderPriority::Secondary,
            timeout_secs: 60,
            enabled: true,
        },
        ProviderConfig {
            name: "google".to_string(),
            base_url: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            default_model: "gemini-1.5-pro".to_string(),
            priority: ProviderPriority::Tertiary,
            timeout_secs: 60,
            enabled: true,
        },
        ProviderConfig {
            name: "xai".to_string(),
            base_url: None,
            api_key_env: "XAI_API_KEY".to_string(),
            default_model: "grok-2".to_string(),
            priority: ProviderPriority::Fallback,
            timeout_secs: 60,
            enabled: true,
        },
        ProviderConfig {
            name: "ollama".to_string(),
            base_url: Some("http://localhost:11434".to_string()),
            api_key_env: "OLLAMA_API_KEY".to_string(),
            default_model: "llama3".to_string(),
            priority: ProviderPriority::Local,
            timeout_secs: 120,
            enabled: false,
        },
    ]
}

/// `(alias, provider, model)` — exact matches win before any substring
/// inference (spec §4.3 step 1).
pub fn default_model_aliases() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("sonnet", "anthropic", "claude-3-5-sonnet-20241022"),
        ("haiku", "anthropic", "claude-3-5-haiku-20241022"),
        ("opus", "anthropic", "claude-3-7-sonnet-20250219"),
        ("gpt-4", "openai", "gpt-4o"),
        ("gpt-4o-mini", "openai", "gpt-4o-mini"),
        ("o1", "openai", "o1"),
        ("gemini", "google", "gemini-1.5-pro"),
        ("gemini-flash", "google", "gemini-2.0-flash"),
        ("grok", "xai", "grok-2"),
        ("llama3", "ollama", "llama3"),
        ("local", "ollama", "llama3.1:8b"),
        ("embed", "openai", "text-embedding-3-small"),
    ]
}

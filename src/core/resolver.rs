//! Model Resolver: a pure function turning a caller-supplied model string
//! into `(provider, model)`, grounded on
//! `original_source/aratta/config.py::resolve_model`.

use crate::config::GatewayConfig;

/// Which provider infers from a substring of the model name when no
/// explicit `provider:model` or alias match exists (spec §4.3 step 3).
fn infer_provider(model: &str) -> Option<&'static str> {
    let model = model.to_lowercase();
    const RULES: &[(&str, &str)] = &[
        ("claude", "anthropic"),
        ("gpt", "openai"),
        ("o1", "openai"),
        ("o3", "openai"),
        ("o4", "openai"),
        ("codex", "openai"),
        ("gemini", "google"),
        ("grok", "xai"),
        ("llama", "ollama"),
        ("mistral", "ollama"),
        ("qwen", "ollama"),
        ("phi", "ollama"),
        ("deepseek", "ollama"),
    ];
    RULES.iter().find(|(needle, _)| model.contains(needle)).map(|(_, provider)| *provider)
}

/// Resolved `(provider name, model name to send upstream)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub provider: String,
    pub model: String,
}

/// Resolves `model_str` against `config` in the order spec §4.3 names:
/// 1. Exact alias match in `default_model_aliases`.
/// 2. Explicit `provider:model` colon split.
/// 3. Case-insensitive substring inference.
/// 4. Fall back to the highest-priority enabled provider's default model.
pub fn resolve_model(config: &GatewayConfig, model_str: &str) -> Option<Resolved> {
    for (alias, provider, model) in crate::config::defaults::default_model_aliases() {
        if alias.eq_ignore_ascii_case(model_str) {
            return Some(Resolved { provider: provider.to_string(), model: model.to_string() });
        }
    }

    if let Some((provider, model)) = model_str.split_once(':') {
        if config.provider(provider).is_some() {
            return Some(Resolved { provider: provider.to_string(), model: model.to_string() });
        }
    }

    if let Some(provider) = infer_provider(model_str) {
        if config.provider(provider).is_some() {
            return Some(Resolved { provider: provider.to_string(), model: model_str.to_string() });
        }
    }

    if let Some(default_provider) = &config.default_provider {
        if let Some(provider) = config.provider(default_provider).filter(|p| p.enabled) {
            return Some(Resolved { provider: provider.name.clone(), model: provider.default_model.clone() });
        }
    }

    let mut candidates: Vec<_> = config.enabled_providers().collect();
    if config.prefer_local {
        candidates.sort_by_key(|p| (p.priority != crate::config::ProviderPriority::Local, p.priority));
    } else {
        candidates.sort_by_key(|p| p.priority);
    }
    candidates
        .first()
        .map(|p| Resolved { provider: p.name.clone(), model: p.default_model.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_alias() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(&config, "sonnet").unwrap();
        assert_eq!(resolved.provider, "anthropic");
        assert_eq!(resolved.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn resolves_explicit_provider_prefix() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(&config, "openai:gpt-4o-2024-11-20").unwrap();
        assert_eq!(resolved.provider, "openai");
        assert_eq!(resolved.model, "gpt-4o-2024-11-20");
    }

    #[test]
    fn infers_provider_from_substring() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(&config, "claude-3-opus-20240229").unwrap();
        assert_eq!(resolved.provider, "anthropic");
    }

    #[test]
    fn falls_back_to_highest_priority_enabled_provider() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(&config, "some-unknown-model").unwrap();
        assert_eq!(resolved.provider, "anthropic");
    }

    #[test]
    fn prefer_local_reorders_fallback_only() {
        let mut config = GatewayConfig::default();
        config.prefer_local = true;
        config.providers.iter_mut().find(|p| p.name == "ollama").unwrap().enabled = true;
        let resolved = resolve_model(&config, "some-unknown-model").unwrap();
        assert_eq!(resolved.provider, "ollama");
    }

    #[test]
    fn resolves_local_alias_to_ollama() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(&config, "local").unwrap();
        assert_eq!(resolved.provider, "ollama");
        assert_eq!(resolved.model, "llama3.1:8b");
    }

    #[test]
    fn resolves_embed_alias_to_openai() {
        let config = GatewayConfig::default();
        let resolved = resolve_model(&config, "embed").unwrap();
        assert_eq!(resolved.provider, "openai");
        assert_eq!(resolved.model, "text-embedding-3-small");
    }

    #[test]
    fn resolution_is_deterministic_across_repeated_calls() {
        let config = GatewayConfig::default();
        let first = resolve_model(&config, "claude-3-5-sonnet-20241022");
        let second = resolve_model(&config, "claude-3-5-sonnet-20241022");
        assert_eq!(first, second);
    }
}

//! Gateway configuration: a YAML file, loaded at startup, with
//! environment-variable overrides applied afterward (spec §6), mirroring
//! the teacher's own `Config::from_file` + `from_env` split and seeded
//! from `original_source/aratta/config.py::load_config`'s precedence
//! (env > file > built-in defaults).

pub mod defaults;
pub mod provider;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use provider::{ProviderConfig, ProviderPriority};

use crate::utils::error::{GatewayError, Result};

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_success_threshold() -> u32 {
    3
}

fn default_health_window_secs() -> u64 {
    300
}

fn default_health_error_threshold() -> u32 {
    3
}

fn default_heal_cooldown_secs() -> u64 {
    600
}

fn default_auto_apply_threshold() -> f32 {
    0.85
}

fn default_max_versions() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_heal_model() -> String {
    "local".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { host: default_host(), port: default_port() }
    }
}

/// Circuit breaker, Health Monitor, and Reload Manager tuning (spec
/// §4.5–§4.7, §6 "Resilience"). Defaults match the original's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "default_true")]
    pub circuit_breaker_enabled: bool,
    #[serde(default = "default_failure_threshold")]
    pub circuit_failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_secs")]
    pub circuit_recovery_timeout_secs: u64,
    #[serde(default = "default_success_threshold")]
    pub circuit_success_threshold: u32,
    #[serde(default = "default_true")]
    pub self_healing_enabled: bool,
    /// Whether a `propose_fix` call with `confidence >= auto_apply_threshold`
    /// applies immediately or still waits in the pending queue (spec §6:
    /// `auto_apply_fixes`). `false` forces every proposal through
    /// human approval regardless of confidence.
    #[serde(default)]
    pub auto_apply_fixes: bool,
    /// Alias of the local model the Heal Worker's diagnose/fix phases use
    /// (spec §6 `heal_model`, default `"local"`).
    #[serde(default = "default_heal_model")]
    pub heal_model: String,
    #[serde(default = "default_health_window_secs")]
    pub health_window_secs: u64,
    #[serde(default = "default_health_error_threshold")]
    pub health_error_threshold: u32,
    #[serde(default = "default_heal_cooldown_secs")]
    pub heal_cooldown_secs: u64,
    #[serde(default = "default_auto_apply_threshold")]
    pub auto_apply_threshold: f32,
    #[serde(default = "default_max_versions")]
    pub max_adapter_versions: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        ResilienceConfig {
            circuit_breaker_enabled: default_true(),
            circuit_failure_threshold: default_failure_threshold(),
            circuit_recovery_timeout_secs: default_recovery_timeout_secs(),
            circuit_success_threshold: default_success_threshold(),
            self_healing_enabled: default_true(),
            auto_apply_fixes: false,
            heal_model: default_heal_model(),
            health_window_secs: default_health_window_secs(),
            health_error_threshold: default_health_error_threshold(),
            heal_cooldown_secs: default_heal_cooldown_secs(),
            auto_apply_threshold: default_auto_apply_threshold(),
            max_adapter_versions: default_max_versions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "defaults::default_providers")]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    /// When set, unqualified alias resolution sorts local providers first
    /// (spec §4.4 supplemented feature).
    #[serde(default)]
    pub prefer_local: bool,
    /// Resolver step 4 fallback (spec §4.3): the provider used when no
    /// alias, explicit prefix, or substring match applies. `None` falls
    /// back further to the highest-priority enabled provider.
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Whether the Router may walk fallback providers on a fallback-
    /// eligible failure (spec §6 `enable_fallback`). `false` makes every
    /// request single-shot against its resolved provider.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    /// Providers the Heal Worker's research phase may fall back through,
    /// in order, excluding the provider currently being healed.
    #[serde(default)]
    pub research_fallback_providers: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            server: ServerConfig::default(),
            providers: defaults::default_providers(),
            resilience: ResilienceConfig::default(),
            prefer_local: false,
            default_provider: None,
            enable_fallback: true,
            research_fallback_providers: vec!["openai".to_string(), "anthropic".to_string()],
        }
    }
}

/// `ARATTA_HOME` env override, or `$HOME/.aratta` (spec §6). Holds
/// `config.yaml` and `.env` when the caller doesn't point elsewhere
/// explicitly, matching `original_source/aratta/config.py`'s `ARATTA_HOME`.
pub fn gateway_home() -> PathBuf {
    if let Ok(home) = std::env::var("ARATTA_HOME") {
        return PathBuf::from(home);
    }
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(base).join(".aratta")
}

impl GatewayConfig {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| GatewayError::Config(format!("reading {}: {e}", path.as_ref().display())))?;
        let config: GatewayConfig =
            serde_yaml::from_str(&raw).map_err(|e| GatewayError::Config(format!("parsing config: {e}")))?;
        Ok(config)
    }

    /// Applies `ARATTA_HOST`/`ARATTA_PORT` overrides on top of whatever
    /// was loaded from file or built-in defaults.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("ARATTA_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ARATTA_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        self
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_primary_and_a_local_provider() {
        let config = GatewayConfig::default();
        assert!(config.providers.iter().any(|p| p.priority == ProviderPriority::Primary));
        assert!(config.providers.iter().any(|p| p.priority == ProviderPriority::Local));
    }

    #[test]
    fn env_override_replaces_port() {
        std::env::set_var("ARATTA_PORT", "9999");
        let config = GatewayConfig::default().apply_env_overrides();
        assert_eq!(config.server.port, 9999);
        std::env::remove_var("ARATTA_PORT");
    }

    #[test]
    fn gateway_home_respects_explicit_override() {
        std::env::set_var("ARATTA_HOME", "/tmp/some-aratta-home");
        assert_eq!(gateway_home(), std::path::PathBuf::from("/tmp/some-aratta-home"));
        std::env::remove_var("ARATTA_HOME");
    }
}

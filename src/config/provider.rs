use serde::{Deserialize, Serialize};

/// Fallback ordering within the Router (spec §4.4): lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPriority {
    Local = 0,
    Primary = 1,
    Secondary = 2,
    Tertiary = 3,
    Fallback = 4,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

/// One upstream's connection details, following
/// `original_source/aratta/config.py::ProviderConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: Option<String>,
    /// Name of the environment variable holding this provider's API key,
    /// resolved at startup — never the key itself (spec §6).
    pub api_key_env: String,
    pub default_model: String,
    pub priority: ProviderPriority,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ProviderConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

//! # aratta-gateway
//!
//! A universal AI-provider gateway: one canonical request/response schema
//! in, any upstream model provider out. A caller sends a `ChatRequest`
//! naming a model (an alias, an explicit `provider:model`, or a bare
//! model name the [`core::resolver`] infers a provider for); the
//! [`core::router::Router`] resolves it, gates on a per-provider
//! [`core::circuit_breaker::CircuitBreaker`], attempts the primary
//! provider, and falls back through the remaining enabled providers on a
//! fallback-eligible failure. Repeated failures of the same kind feed the
//! [`core::health::HealthMonitor`], which fires a [`core::heal::HealWorker`]
//! diagnose/research/fix cycle whose proposals flow through the
//! [`core::reload::ReloadManager`]'s versioned apply/rollback queue.

#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod metrics;
pub mod server;
pub mod utils;

pub use config::GatewayConfig;
pub use utils::error::{GatewayError, Result};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate.
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata baked in by `build.rs`.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub git_hash: &'static str,
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: env!("BUILD_TIME"),
            git_hash: env!("GIT_HASH"),
            rust_version: env!("RUST_VERSION"),
        }
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_info_reports_the_crate_version() {
        let info = build_info();
        assert_eq!(info.version, VERSION);
    }

    #[test]
    fn constants_match_cargo_metadata() {
        assert_eq!(NAME, env!("CARGO_PKG_NAME"));
        assert_eq!(DESCRIPTION, env!("CARGO_PKG_DESCRIPTION"));
    }
}

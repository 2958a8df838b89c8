//! Reload Manager (spec §4.7): versioned backup/apply/verify/rollback for
//! an adapter's "source" (here: its runtime-swappable base URL/model
//! config, since there is no in-process code to hot-patch), plus a
//! human-approval queue for low-confidence fix proposals. Grounded on
//! `original_source/aratta/resilience/reload_manager.py`, including its
//! exact "propose only" `_apply_code_patch` behavior.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::registry::{ProviderOverride, ProviderRegistry};
use crate::utils::error::{GatewayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
    Verified,
    RolledBack,
}

/// One recorded snapshot of a provider's effective config, kept so a bad
/// apply can be rolled back (spec §4.7, max 10 retained per provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterVersion {
    pub version: u32,
    pub provider: String,
    pub base_url: Option<String>,
    pub default_model: String,
    pub created_at: DateTime<Utc>,
}

/// A proposed fix awaiting either auto-apply (confidence above the
/// configured threshold) or human approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixApplication {
    pub provider: String,
    pub status: FixStatus,
    pub confidence: f32,
    pub change_summary: String,
    pub proposed_base_url: Option<String>,
    pub proposed_default_model: Option<String>,
    /// Always `false`: generated fix code is proposed, never executed
    /// (spec Non-goal "no unattended execution of generated code patches").
    pub code_changed: bool,
    pub created_at: DateTime<Utc>,
}

/// Runs the Reload Manager's post-apply check (spec §4.7 step 6). The
/// production wiring probes the live adapter; tests inject a stub so
/// `apply_fix` stays deterministic and offline.
#[async_trait]
pub trait FixVerifier: Send + Sync {
    async fn verify(&self, provider: &str) -> bool;
}

/// Calls the rebuilt adapter's `health_check` (spec §4.2) after an apply.
pub struct HealthCheckVerifier {
    registry: Arc<ProviderRegistry>,
}

impl HealthCheckVerifier {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        HealthCheckVerifier { registry }
    }
}

#[async_trait]
impl FixVerifier for HealthCheckVerifier {
    async fn verify(&self, provider: &str) -> bool {
        match self.registry.get(provider) {
            Ok(adapter) => adapter.health_check().await.is_ok(),
            Err(_) => false,
        }
    }
}

const MAX_VERSIONS: usize = 10;

struct ProviderHistory {
    versions: Vec<AdapterVersion>,
    next_version: u32,
    current_version: u32,
}

pub struct ReloadManager {
    history_path: Option<PathBuf>,
    auto_apply_threshold: f32,
    /// Spec §6 `auto_apply_fixes`: when `false`, every proposal queues for
    /// human approval regardless of confidence.
    auto_apply_fixes: bool,
    history: Mutex<HashMap<String, ProviderHistory>>,
    pending_fixes: Mutex<HashMap<String, FixApplication>>,
    registry: Arc<ProviderRegistry>,
    verifier: Arc<dyn FixVerifier>,
}

impl ReloadManager {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        auto_apply_threshold: f32,
        auto_apply_fixes: bool,
        history_path: Option<PathBuf>,
    ) -> Self {
        let verifier = Arc::new(HealthCheckVerifier::new(registry.clone()));
        Self::with_verifier(registry, auto_apply_threshold, auto_apply_fixes, history_path, verifier)
    }

    pub fn with_verifier(
        registry: Arc<ProviderRegistry>,
        auto_apply_threshold: f32,
        auto_apply_fixes: bool,
        history_path: Option<PathBuf>,
        verifier: Arc<dyn FixVerifier>,
    ) -> Self {
        ReloadManager {
            history_path,
            auto_apply_threshold,
            auto_apply_fixes,
            history: Mutex::new(HashMap::new()),
            pending_fixes: Mutex::new(HashMap::new()),
            registry,
            verifier,
        }
    }

    /// Snapshots a provider's current *effective* config (static config
    /// overlaid with any standing override) before attempting a fix, so a
    /// failed verify has something exact to roll back to.
    fn backup(&self, provider: &str) -> AdapterVersion {
        let config = self.registry.config().provider(provider).expect("provider must be configured to heal it");
        let (base_url, default_model) = self.registry.effective_config(provider);
        let base_url = base_url.or_else(|| config.base_url.clone());
        let default_model = default_model.unwrap_or_else(|| config.default_model.clone());

        let mut history = self.history.lock().unwrap();
        let entry = history
            .entry(provider.to_string())
            .or_insert_with(|| ProviderHistory { versions: Vec::new(), next_version: 1, current_version: 0 });
        let version = AdapterVersion {
            version: entry.next_version,
            provider: provider.to_string(),
            base_url,
            default_model,
            created_at: Utc::now(),
        };
        entry.next_version += 1;
        entry.versions.push(version.clone());
        while entry.versions.len() > MAX_VERSIONS {
            entry.versions.remove(0);
        }
        version
    }

    /// `_apply_code_patch` in the original always returns `false` without
    /// writing anything; this mirrors that exactly — there is no sandboxed
    /// compile+test gate in this crate, so no generated code is ever run.
    fn apply_code_patch(&self, fix: &FixApplication) -> bool {
        tracing::info!(provider = %fix.provider, summary = %fix.change_summary, "fix proposed, not auto-applied to source");
        false
    }

    /// Queues a fix proposal. Confidence at or above the configured
    /// threshold is auto-applied immediately; below it, the fix waits in
    /// `pending_fixes` for `approve`/`reject`.
    pub async fn propose_fix(&self, fix: FixApplication) -> Result<()> {
        if self.auto_apply_fixes && fix.confidence >= self.auto_apply_threshold {
            self.apply(fix).await
        } else {
            self.pending_fixes.lock().unwrap().insert(fix.provider.clone(), fix);
            Ok(())
        }
    }

    pub fn pending_fixes(&self) -> Vec<FixApplication> {
        self.pending_fixes.lock().unwrap().values().cloned().collect()
    }

    pub async fn approve(&self, provider: &str) -> Result<()> {
        let fix = self
            .pending_fixes
            .lock()
            .unwrap()
            .remove(provider)
            .ok_or_else(|| GatewayError::NotFound(format!("no pending fix for '{provider}'")))?;
        self.apply(fix).await
    }

    pub fn reject(&self, provider: &str, _reason: &str) -> Result<()> {
        self.pending_fixes
            .lock()
            .unwrap()
            .remove(provider)
            .ok_or_else(|| GatewayError::NotFound(format!("no pending fix for '{provider}'")))?;
        Ok(())
    }

    /// Backs up, applies a config-shaped fix (if any), verifies, and
    /// commits or rolls back (spec §4.7 steps 3-8).
    async fn apply(&self, mut fix: FixApplication) -> Result<()> {
        let previous = self.backup(&fix.provider);
        self.apply_code_patch(&fix);
        fix.code_changed = false;

        let is_config_change = fix.proposed_base_url.is_some() || fix.proposed_default_model.is_some();
        if is_config_change {
            self.registry.set_override(
                &fix.provider,
                ProviderOverride { base_url: fix.proposed_base_url.clone(), default_model: fix.proposed_default_model.clone() },
            );
            self.registry.evict(&fix.provider);
        }
        fix.status = FixStatus::Applied;

        if self.verifier.verify(&fix.provider).await {
            fix.status = FixStatus::Verified;
            self.commit_current(&fix.provider);
        } else {
            // Restoring the previous snapshot is a no-op when this fix
            // never touched live config (propose-only patches), and an
            // actual revert when it did.
            if is_config_change {
                self.registry.set_override(
                    &fix.provider,
                    ProviderOverride { base_url: previous.base_url.clone(), default_model: Some(previous.default_model.clone()) },
                );
                self.registry.evict(&fix.provider);
            }
            fix.status = FixStatus::RolledBack;
        }

        self.persist_history()
    }

    fn commit_current(&self, provider: &str) {
        let mut history = self.history.lock().unwrap();
        if let Some(entry) = history.get_mut(provider) {
            if let Some(latest) = entry.versions.last() {
                entry.current_version = latest.version;
            }
        }
    }

    pub fn history(&self, provider: &str) -> Vec<AdapterVersion> {
        self.history.lock().unwrap().get(provider).map(|h| h.versions.clone()).unwrap_or_default()
    }

    pub fn current_version(&self, provider: &str) -> Option<u32> {
        self.history.lock().unwrap().get(provider).map(|h| h.current_version)
    }

    /// Reverts to a prior version and evicts the cached adapter so the
    /// next request rebuilds against the restored config.
    pub fn rollback(&self, provider: &str, version: u32) -> Result<()> {
        let mut history = self.history.lock().unwrap();
        let entry = history
            .get_mut(provider)
            .ok_or_else(|| GatewayError::NotFound(format!("no history for '{provider}'")))?;
        let target = entry
            .versions
            .iter()
            .find(|v| v.version == version)
            .ok_or_else(|| GatewayError::NotFound(format!("version {version} not found for '{provider}'")))?
            .clone();
        entry.current_version = version;
        drop(history);

        self.registry.set_override(
            provider,
            ProviderOverride { base_url: target.base_url, default_model: Some(target.default_model) },
        );
        self.registry.evict(provider);
        Ok(())
    }

    fn persist_history(&self) -> Result<()> {
        let Some(path) = &self.history_path else { return Ok(()) };
        let snapshot: HashMap<String, Vec<AdapterVersion>> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.versions.clone()))
            .collect();
        let json = serde_json::to_vec_pretty(&snapshot)?;
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    struct AlwaysVerifies;
    #[async_trait]
    impl FixVerifier for AlwaysVerifies {
        async fn verify(&self, _provider: &str) -> bool {
            true
        }
    }

    struct NeverVerifies;
    #[async_trait]
    impl FixVerifier for NeverVerifies {
        async fn verify(&self, _provider: &str) -> bool {
            false
        }
    }

    fn manager_with(verifier: Arc<dyn FixVerifier>) -> ReloadManager {
        let registry = Arc::new(ProviderRegistry::new(GatewayConfig::default()));
        ReloadManager::with_verifier(registry, 0.85, true, None, verifier)
    }

    fn fix(confidence: f32) -> FixApplication {
        FixApplication {
            provider: "anthropic".to_string(),
            status: FixStatus::Pending,
            confidence,
            change_summary: "widen timeout".to_string(),
            proposed_base_url: None,
            proposed_default_model: None,
            code_changed: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn high_confidence_fix_auto_applies_and_is_not_pending() {
        let manager = manager_with(Arc::new(AlwaysVerifies));
        manager.propose_fix(fix(0.9)).await.unwrap();
        assert!(manager.pending_fixes().is_empty());
        assert_eq!(manager.history("anthropic").len(), 1);
        assert_eq!(manager.current_version("anthropic"), Some(1));
    }

    #[tokio::test]
    async fn low_confidence_fix_queues_for_approval() {
        let manager = manager_with(Arc::new(AlwaysVerifies));
        manager.propose_fix(fix(0.5)).await.unwrap();
        assert_eq!(manager.pending_fixes().len(), 1);
        manager.approve("anthropic").await.unwrap();
        assert!(manager.pending_fixes().is_empty());
    }

    #[tokio::test]
    async fn rejecting_a_fix_clears_it_without_applying() {
        let manager = manager_with(Arc::new(AlwaysVerifies));
        manager.propose_fix(fix(0.5)).await.unwrap();
        manager.reject("anthropic", "not needed").unwrap();
        assert!(manager.history("anthropic").is_empty());
    }

    #[tokio::test]
    async fn disabled_auto_apply_queues_even_high_confidence_fixes() {
        let registry = Arc::new(ProviderRegistry::new(GatewayConfig::default()));
        let manager = ReloadManager::with_verifier(registry, 0.85, false, None, Arc::new(AlwaysVerifies));
        manager.propose_fix(fix(0.99)).await.unwrap();
        assert_eq!(manager.pending_fixes().len(), 1);
    }

    #[tokio::test]
    async fn code_patches_are_never_marked_applied_to_source() {
        let manager = manager_with(Arc::new(AlwaysVerifies));
        let mut f = fix(0.95);
        f.code_changed = true;
        manager.propose_fix(f).await.unwrap();
        // apply() always forces code_changed back to false before storing.
        assert!(manager.pending_fixes().is_empty());
    }

    #[tokio::test]
    async fn failed_verify_rolls_back_a_config_change() {
        let registry = Arc::new(ProviderRegistry::new(GatewayConfig::default()));
        let original_model = registry.config().provider("anthropic").unwrap().default_model.clone();
        let manager = ReloadManager::with_verifier(registry.clone(), 0.85, true, None, Arc::new(NeverVerifies));

        let mut f = fix(0.9);
        f.proposed_default_model = Some("claude-broken".to_string());
        manager.propose_fix(f).await.unwrap();

        let adapter = registry.get("anthropic").unwrap();
        assert_eq!(adapter.default_model(), original_model);
    }

    #[tokio::test]
    async fn successful_verify_keeps_a_config_change_applied() {
        let registry = Arc::new(ProviderRegistry::new(GatewayConfig::default()));
        let manager = ReloadManager::with_verifier(registry.clone(), 0.85, true, None, Arc::new(AlwaysVerifies));

        let mut f = fix(0.9);
        f.proposed_default_model = Some("claude-fixed".to_string());
        manager.propose_fix(f).await.unwrap();

        let adapter = registry.get("anthropic").unwrap();
        assert_eq!(adapter.default_model(), "claude-fixed");
    }

    #[tokio::test]
    async fn rollback_to_version_restores_that_versions_config() {
        let registry = Arc::new(ProviderRegistry::new(GatewayConfig::default()));
        let original_model = registry.config().provider("anthropic").unwrap().default_model.clone();
        let manager = ReloadManager::with_verifier(registry.clone(), 0.85, true, None, Arc::new(AlwaysVerifies));

        let mut f = fix(0.9);
        f.proposed_default_model = Some("claude-v2".to_string());
        manager.propose_fix(f).await.unwrap();
        assert_eq!(registry.get("anthropic").unwrap().default_model(), "claude-v2");

        manager.rollback("anthropic", 1).unwrap();
        assert_eq!(registry.get("anthropic").unwrap().default_model(), original_model);
    }
}

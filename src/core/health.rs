//! Health Monitor (spec §4.6): classifies adapter errors, keeps a bounded
//! per-provider history, and decides when enough of the same error
//! justifies firing a heal cycle. Grounded on
//! `original_source/aratta/resilience/health.py`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::core::providers::ProviderError;

const MAX_HISTORY_PER_PROVIDER: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Healable,
    Transient,
    Unknown,
}

/// Classifies by substring match against the error **message** (spec
/// §4.6 step 2, `health.py:34-48`), not against a fixed `ProviderError`
/// variant token — the same variant (e.g. `InvalidRequest`) can carry a
/// transient or a healable upstream complaint depending on its text.
fn classify(message: &str) -> ErrorKind {
    const HEALABLE: &[&str] = &[
        "schema-mismatch",
        "unknown-field",
        "deprecated-field",
        "streaming-format",
        "tool-schema",
    ];
    const TRANSIENT: &[&str] =
        &["rate-limit", "rate_limit", "rate limited", "connection-error", "transport", "timeout"];
    if HEALABLE.iter().any(|needle| message.contains(needle)) {
        ErrorKind::Healable
    } else if TRANSIENT.iter().any(|needle| message.contains(needle)) {
        ErrorKind::Transient
    } else {
        ErrorKind::Unknown
    }
}

/// One recorded failure, with a stable signature so repeats of "the same"
/// error can be counted even when the upstream message embeds a changing
/// detail (a request id, a byte offset).
#[derive(Debug, Clone)]
pub struct AdapterError {
    pub provider: String,
    pub kind: ErrorKind,
    pub message: String,
    pub at: Instant,
}

impl AdapterError {
    /// First 16 hex chars of `sha256("{provider}:{kind}:{normalized_message}")`,
    /// where every run of digits in the message is collapsed to `N` so
    /// "retry after 42s" and "retry after 57s" hash identically.
    pub fn signature(&self) -> String {
        let normalized = normalize_digits(&self.message);
        let input = format!("{}:{:?}:{}", self.provider, self.kind, normalized);
        let digest = Sha256::digest(input.as_bytes());
        hex::encode(digest)[..16].to_string()
    }
}

fn normalize_digits(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut in_digits = false;
    for c in message.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                out.push('N');
                in_digits = true;
            }
        } else {
            in_digits = false;
            out.push(c);
        }
    }
    out
}

struct ProviderHealth {
    history: VecDeque<AdapterError>,
    consecutive_failures: u32,
    last_healed_at: Option<Instant>,
}

impl ProviderHealth {
    fn new() -> Self {
        ProviderHealth { history: VecDeque::new(), consecutive_failures: 0, last_healed_at: None }
    }
}

pub struct HealthMonitor {
    window: Duration,
    error_threshold: u32,
    heal_cooldown: Duration,
    providers: Mutex<HashMap<String, ProviderHealth>>,
    healing_in_progress: Mutex<HashSet<String>>,
    healing_paused: Mutex<HashSet<String>>,
}

impl HealthMonitor {
    pub fn new(window: Duration, error_threshold: u32, heal_cooldown: Duration) -> Self {
        HealthMonitor {
            window,
            error_threshold,
            heal_cooldown,
            providers: Mutex::new(HashMap::new()),
            healing_in_progress: Mutex::new(HashSet::new()),
            healing_paused: Mutex::new(HashSet::new()),
        }
    }

    /// Records a failure. Always increments the provider's consecutive-
    /// failure counter and appends to its bounded history. Returns the
    /// last five errors (most recent first) exactly when this call is the
    /// one that should trigger a heal cycle — the healing-in-progress set
    /// is updated and the cooldown clock stamped atomically with that
    /// decision so two racing callers can't both fire one (spec §4.6
    /// steps 4-5).
    pub fn record_error(&self, provider: &str, error: &ProviderError) -> Option<Vec<AdapterError>> {
        let message = error.to_string();
        let kind = classify(&message);
        let adapter_error = AdapterError { provider: provider.to_string(), kind, message, at: Instant::now() };

        let mut providers = self.providers.lock().unwrap();
        let health = providers.entry(provider.to_string()).or_insert_with(ProviderHealth::new);
        health.consecutive_failures += 1;
        health.history.push_back(adapter_error);
        while health.history.len() > MAX_HISTORY_PER_PROVIDER {
            health.history.pop_front();
        }

        if kind == ErrorKind::Transient {
            return None;
        }
        if self.healing_paused.lock().unwrap().contains(provider) {
            return None;
        }
        let mut healing = self.healing_in_progress.lock().unwrap();
        if healing.contains(provider) {
            return None;
        }
        if let Some(last) = health.last_healed_at {
            if last.elapsed() < self.heal_cooldown {
                return None;
            }
        }
        let cutoff = Instant::now() - self.window;
        let count = health.history.iter().filter(|e| e.at >= cutoff).count();
        if (count as u32) < self.error_threshold {
            return None;
        }

        healing.insert(provider.to_string());
        health.last_healed_at = Some(Instant::now());
        Some(health.history.iter().rev().take(5).cloned().collect())
    }

    /// Resets the consecutive-failure counter on a success. History is
    /// left intact (spec §4.6: "does not clear history").
    pub fn record_success(&self, provider: &str) {
        let mut providers = self.providers.lock().unwrap();
        let health = providers.entry(provider.to_string()).or_insert_with(ProviderHealth::new);
        health.consecutive_failures = 0;
    }

    /// Ends a heal cycle. On success, clears the provider's history and
    /// consecutive-failure counter (spec §4.6 `handle_heal_complete`); on
    /// failure, only the in-progress marker is cleared so the cooldown and
    /// history keep accumulating toward another attempt.
    pub fn handle_heal_complete(&self, provider: &str, success: bool) {
        self.healing_in_progress.lock().unwrap().remove(provider);
        if success {
            if let Some(health) = self.providers.lock().unwrap().get_mut(provider) {
                health.history.clear();
                health.consecutive_failures = 0;
            }
        }
    }

    pub fn pause(&self, provider: &str) {
        self.healing_paused.lock().unwrap().insert(provider.to_string());
    }

    pub fn resume(&self, provider: &str) {
        self.healing_paused.lock().unwrap().remove(provider);
    }

    pub fn is_paused(&self, provider: &str) -> bool {
        self.healing_paused.lock().unwrap().contains(provider)
    }

    pub fn is_healing(&self, provider: &str) -> bool {
        self.healing_in_progress.lock().unwrap().contains(provider)
    }

    pub fn consecutive_failures(&self, provider: &str) -> u32 {
        self.providers.lock().unwrap().get(provider).map(|h| h.consecutive_failures).unwrap_or(0)
    }

    pub fn recent_errors(&self, provider: &str) -> Vec<AdapterError> {
        self.providers
            .lock()
            .unwrap()
            .get(provider)
            .map(|h| h.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(provider: &str) -> ProviderError {
        ProviderError::InvalidRequest {
            provider: provider.to_string(),
            message: "schema-mismatch: unknown field 'foo' at offset 42".to_string(),
        }
    }

    #[test]
    fn signature_is_stable_across_changing_digits() {
        let a = AdapterError {
            provider: "p".to_string(),
            kind: ErrorKind::Healable,
            message: "schema-mismatch at offset 42".to_string(),
            at: Instant::now(),
        };
        let b = AdapterError { message: "schema-mismatch at offset 57".to_string(), ..a.clone() };
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn fires_heal_after_threshold_within_window() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 3, Duration::from_secs(600));
        assert!(monitor.record_error("p", &err("p")).is_none());
        assert!(monitor.record_error("p", &err("p")).is_none());
        let fired = monitor.record_error("p", &err("p"));
        assert!(fired.is_some());
        assert!(fired.unwrap().len() <= 5);
    }

    #[test]
    fn a_fired_heal_does_not_fire_again_while_in_progress() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 2, Duration::from_secs(600));
        assert!(monitor.record_error("p", &err("p")).is_none());
        assert!(monitor.record_error("p", &err("p")).is_some());
        // A third error arrives before handle_heal_complete: must not fire again.
        assert!(monitor.record_error("p", &err("p")).is_none());
    }

    #[test]
    fn cooldown_suppresses_repeat_heal_after_one_completes() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 1, Duration::from_secs(600));
        assert!(monitor.record_error("p", &err("p")).is_some());
        monitor.handle_heal_complete("p", true);
        assert!(monitor.record_error("p", &err("p")).is_none());
    }

    #[test]
    fn successful_heal_clears_history_and_counters() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 1, Duration::from_secs(0));
        monitor.record_error("p", &err("p"));
        monitor.handle_heal_complete("p", true);
        assert!(monitor.recent_errors("p").is_empty());
        assert_eq!(monitor.consecutive_failures("p"), 0);
    }

    #[test]
    fn paused_provider_never_fires_heal() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 1, Duration::from_secs(600));
        monitor.pause("p");
        assert!(monitor.record_error("p", &err("p")).is_none());
    }

    #[test]
    fn transient_errors_are_never_healable() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 1, Duration::from_secs(600));
        let error = ProviderError::RateLimit { provider: "p".to_string(), message: "slow down".to_string(), retry_after_secs: None };
        assert!(monitor.record_error("p", &error).is_none());
    }

    #[test]
    fn every_failure_increments_the_consecutive_counter() {
        let monitor = HealthMonitor::new(Duration::from_secs(300), 10, Duration::from_secs(600));
        let transient = ProviderError::RateLimit { provider: "p".to_string(), message: "slow down".to_string(), retry_after_secs: None };
        monitor.record_error("p", &transient);
        monitor.record_error("p", &transient);
        assert_eq!(monitor.consecutive_failures("p"), 2);
        monitor.record_success("p");
        assert_eq!(monitor.consecutive_failures("p"), 0);
    }
}

//! Per-provider three-state circuit breaker (spec §4.5), grounded on the
//! teacher's `utils/error/recovery/circuit_breaker.rs` for the Rust shape
//! and on `original_source/aratta/resilience/circuit_breaker.py` for the
//! exact transition table, including `record_failure`'s `should_heal`
//! return and the `force_open`/`force_close`/`reset` admin ops.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
        }
    }
}

struct ProviderCircuit {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

impl ProviderCircuit {
    fn new() -> Self {
        ProviderCircuit { state: CircuitState::Closed, consecutive_failures: 0, consecutive_successes: 0, opened_at: None }
    }
}

/// One breaker instance guards every provider; state is keyed by provider
/// name under a single mutex (spec's concurrency model: O(1) ops, one
/// lock per component).
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: Mutex<HashMap<String, ProviderCircuit>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        CircuitBreaker { config, circuits: Mutex::new(HashMap::new()) }
    }

    /// Whether a request may currently be attempted against `provider`.
    /// An OPEN circuit past its recovery timeout transitions itself to
    /// HALF_OPEN as a side effect of this check, per the original.
    pub fn can_execute(&self, provider: &str) -> bool {
        let mut circuits = self.circuits.lock().unwrap();
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);
        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = circuit.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.recovery_timeout {
                    circuit.state = CircuitState::HalfOpen;
                    circuit.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        self.circuits.lock().unwrap().get(provider).map(|c| c.state).unwrap_or(CircuitState::Closed)
    }

    pub fn failure_count(&self, provider: &str) -> u32 {
        self.circuits.lock().unwrap().get(provider).map(|c| c.consecutive_failures).unwrap_or(0)
    }

    /// Seconds remaining before an OPEN circuit becomes eligible to probe
    /// again, in `(0, recovery_timeout]`; `None` when not OPEN (spec §8
    /// scenario 3's `get_recovery_time`).
    pub fn recovery_time_secs(&self, provider: &str) -> Option<u64> {
        let circuits = self.circuits.lock().unwrap();
        let circuit = circuits.get(provider)?;
        if circuit.state != CircuitState::Open {
            return None;
        }
        let elapsed = circuit.opened_at.map(|t| t.elapsed()).unwrap_or_default();
        Some(self.config.recovery_timeout.saturating_sub(elapsed).as_secs().max(1))
    }

    /// Records a success. In HALF_OPEN, enough consecutive successes close
    /// the circuit and clear its failure count.
    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.circuits.lock().unwrap();
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);
        circuit.consecutive_failures = 0;
        match circuit.state {
            CircuitState::Closed => {}
            CircuitState::HalfOpen => {
                circuit.consecutive_successes += 1;
                if circuit.consecutive_successes >= self.config.success_threshold {
                    circuit.state = CircuitState::Closed;
                    circuit.opened_at = None;
                    circuit.consecutive_successes = 0;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failure. Returns `true` exactly when this call is the one
    /// that transitioned CLOSED → OPEN — the Health Monitor uses that edge
    /// to decide whether to fire a heal cycle (spec §4.6).
    pub fn record_failure(&self, provider: &str) -> bool {
        let mut circuits = self.circuits.lock().unwrap();
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);
        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures += 1;
                if circuit.consecutive_failures >= self.config.failure_threshold {
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(Instant::now());
                    return true;
                }
                false
            }
            CircuitState::HalfOpen => {
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.consecutive_successes = 0;
                false
            }
            CircuitState::Open => false,
        }
    }

    /// Forces the circuit open, bypassing the failure-threshold state
    /// machine (admin op, spec §4.9 `POST /circuit/{p}/open`).
    pub fn force_open(&self, provider: &str) {
        let mut circuits = self.circuits.lock().unwrap();
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);
        circuit.state = CircuitState::Open;
        circuit.opened_at = Some(Instant::now());
    }

    pub fn force_close(&self, provider: &str) {
        let mut circuits = self.circuits.lock().unwrap();
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);
        circuit.state = CircuitState::Closed;
        circuit.opened_at = None;
        circuit.consecutive_failures = 0;
        circuit.consecutive_successes = 0;
    }

    pub fn reset(&self, provider: &str) {
        self.force_close(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_millis(20),
            success_threshold: 2,
        })
    }

    #[test]
    fn opens_after_failure_threshold_and_reports_the_transition() {
        let cb = breaker();
        assert!(!cb.record_failure("p"));
        assert!(cb.record_failure("p"));
        assert_eq!(cb.state("p"), CircuitState::Open);
        assert!(!cb.can_execute("p"));
    }

    #[test]
    fn half_open_after_recovery_timeout_then_closes_after_successes() {
        let cb = breaker();
        cb.record_failure("p");
        cb.record_failure("p");
        std::thread::sleep(Duration::from_millis(25));
        assert!(cb.can_execute("p"));
        assert_eq!(cb.state("p"), CircuitState::HalfOpen);
        cb.record_success("p");
        assert_eq!(cb.state("p"), CircuitState::HalfOpen);
        cb.record_success("p");
        assert_eq!(cb.state("p"), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let cb = breaker();
        cb.record_failure("p");
        cb.record_failure("p");
        std::thread::sleep(Duration::from_millis(25));
        cb.can_execute("p");
        cb.record_failure("p");
        assert_eq!(cb.state("p"), CircuitState::Open);
    }

    #[test]
    fn recovery_time_is_in_range_while_open_and_absent_otherwise() {
        let cb = breaker();
        assert_eq!(cb.recovery_time_secs("p"), None);
        cb.record_failure("p");
        cb.record_failure("p");
        let remaining = cb.recovery_time_secs("p").unwrap();
        assert!(remaining > 0 && remaining <= 60);
    }

    #[test]
    fn failure_count_tracks_consecutive_failures_while_closed() {
        let cb = breaker();
        assert_eq!(cb.failure_count("p"), 0);
        cb.record_failure("p");
        assert_eq!(cb.failure_count("p"), 1);
        cb.record_success("p");
        assert_eq!(cb.failure_count("p"), 0);
    }

    #[test]
    fn admin_ops_bypass_the_state_machine() {
        let cb = breaker();
        cb.force_open("p");
        assert_eq!(cb.state("p"), CircuitState::Open);
        cb.force_close("p");
        assert_eq!(cb.state("p"), CircuitState::Closed);
    }

    #[test]
    fn success_resets_failure_count_while_closed() {
        let cb = breaker();
        cb.record_failure("p");
        cb.record_success("p");
        assert!(!cb.record_failure("p"));
    }
}

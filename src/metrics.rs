//! Request counters, circuit-state gauges, and a bounded latency ring
//! buffer, exported via `prometheus` (the teacher's `metrics` feature)
//! and surfaced raw through `GET /metrics` and `GET /dashboard`.

use std::collections::VecDeque;
use std::sync::Mutex;

use prometheus::{
    Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Observations retained per provider for the in-memory latency summary
/// shown on `/dashboard` (spec §5: histogram capped at 1000 samples).
const MAX_LATENCY_SAMPLES: usize = 1000;

pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    circuit_state: IntGaugeVec,
    latencies: Mutex<std::collections::HashMap<String, VecDeque<u64>>>,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new("gateway_requests_total", "Chat/embed requests by provider and outcome"),
            &["provider", "status"],
        )
        .expect("metric names are static and valid");
        let circuit_state = IntGaugeVec::new(
            Opts::new("gateway_circuit_state", "0=closed 1=half_open 2=open"),
            &["provider"],
        )
        .expect("metric names are static and valid");
        registry.register(Box::new(requests_total.clone())).expect("single registration");
        registry.register(Box::new(circuit_state.clone())).expect("single registration");
        Metrics { registry, requests_total, circuit_state, latencies: Mutex::new(Default::default()) }
    }

    pub fn record_request(&self, provider: &str, ok: bool, latency_ms: u64) {
        self.requests_total.with_label_values(&[provider, if ok { "ok" } else { "error" }]).inc();
        let mut latencies = self.latencies.lock().unwrap();
        let samples = latencies.entry(provider.to_string()).or_default();
        samples.push_back(latency_ms);
        while samples.len() > MAX_LATENCY_SAMPLES {
            samples.pop_front();
        }
    }

    pub fn set_circuit_state(&self, provider: &str, state: crate::core::circuit_breaker::CircuitState) {
        let value = match state {
            crate::core::circuit_breaker::CircuitState::Closed => 0,
            crate::core::circuit_breaker::CircuitState::HalfOpen => 1,
            crate::core::circuit_breaker::CircuitState::Open => 2,
        };
        self.circuit_state.with_label_values(&[provider]).set(value);
    }

    /// `(count, p50, p99)` latency in milliseconds over retained samples.
    pub fn latency_summary(&self, provider: &str) -> Option<(usize, u64, u64)> {
        let latencies = self.latencies.lock().unwrap();
        let samples = latencies.get(provider)?;
        if samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<_> = samples.iter().copied().collect();
        sorted.sort_unstable();
        let p50 = sorted[sorted.len() / 2];
        let p99 = sorted[(sorted.len() * 99 / 100).min(sorted.len() - 1)];
        Some((sorted.len(), p50, p99))
    }

    /// Prometheus text exposition format for `GET /metrics`.
    pub fn render(&self) -> String {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer).expect("text encoding cannot fail");
        String::from_utf8(buffer).expect("prometheus text output is always valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_ring_buffer_is_bounded() {
        let metrics = Metrics::new();
        for i in 0..1500 {
            metrics.record_request("anthropic", true, i);
        }
        let (count, _, _) = metrics.latency_summary("anthropic").unwrap();
        assert_eq!(count, MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn render_includes_registered_metric_names() {
        let metrics = Metrics::new();
        metrics.record_request("openai", true, 42);
        let text = metrics.render();
        assert!(text.contains("gateway_requests_total"));
    }
}

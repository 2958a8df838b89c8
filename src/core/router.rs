//! Router (spec §4.4): resolve a model string, gate on the circuit
//! breaker, attempt the primary provider, and on a fallback-eligible
//! failure walk the remaining enabled providers in priority order.
//! Grounded on `original_source/aratta/server.py::_get_provider_with_fallback`
//! (construction-failure fallback) combined with `circuit_breaker.py`/
//! `health.py` (runtime-failure fallback, which the original splits across
//! those two modules rather than naming a single "Router").

use std::sync::{Arc, RwLock, Weak};
use std::time::Instant;

use futures::stream::BoxStream;
use tracing::{info, warn};

use crate::core::circuit_breaker::CircuitBreaker;
use crate::core::health::{AdapterError, HealthMonitor};
use crate::core::providers::ProviderError;
use crate::core::registry::ProviderRegistry;
use crate::core::resolver::resolve_model;
use crate::core::types::{ChatRequest, ChatResponse, ChatStreamEvent, EmbeddingRequest, EmbeddingResponse};
use crate::utils::error::{should_fallback, GatewayError, Result};

/// Invoked with `(provider, last-5-errors)` exactly when the Health
/// Monitor decides a heal cycle should start (spec §4.6 step 5). The
/// Router only fires the hook; starting the async heal cycle and closing
/// the loop with `HealthMonitor::handle_heal_complete` is the hook's job
/// (wired up in `server::state::AppState::new`, which is the one place
/// that also owns the `HealWorker` and `ReloadManager`).
pub type HealHook = Arc<dyn Fn(String, Vec<AdapterError>) + Send + Sync>;

pub struct Router {
    registry: Arc<ProviderRegistry>,
    circuit_breaker: Arc<CircuitBreaker>,
    health_monitor: Arc<HealthMonitor>,
    heal_hook: RwLock<Option<HealHook>>,
}

impl Router {
    pub fn new(registry: Arc<ProviderRegistry>, circuit_breaker: Arc<CircuitBreaker>, health_monitor: Arc<HealthMonitor>) -> Self {
        Router { registry, circuit_breaker, health_monitor, heal_hook: RwLock::new(None) }
    }

    /// Registers the callback the Health Monitor's firing edge invokes.
    /// Takes `&self` (not `&mut self`) so it can be set once, after
    /// construction, on an already-`Arc`'d Router — see `AppState::new`,
    /// which needs the Router itself to exist before it can build a
    /// closure that calls back into it via `Weak`.
    pub fn set_heal_hook(&self, hook: HealHook) {
        *self.heal_hook.write().unwrap() = Some(hook);
    }

    pub fn health_monitor(&self) -> &Arc<HealthMonitor> {
        &self.health_monitor
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Providers to try, primary first, ordered by configured priority
    /// among the remaining enabled providers (spec §4.4). Returns just
    /// `[primary]` when `enable_fallback` is off, making every request
    /// single-shot against its resolved provider.
    fn candidate_order(&self, primary: &str) -> Vec<String> {
        let config = self.registry.config();
        if !config.enable_fallback {
            return vec![primary.to_string()];
        }
        let mut rest: Vec<_> = config.enabled_providers().filter(|p| p.name != primary).collect();
        rest.sort_by_key(|p| p.priority);
        std::iter::once(primary.to_string()).chain(rest.into_iter().map(|p| p.name.clone())).collect()
    }

    /// Whether the circuit breaker gates this provider at all (spec §6
    /// `circuit_breaker_enabled`). When disabled every provider is always
    /// considered executable.
    fn can_execute(&self, provider: &str) -> bool {
        !self.registry.config().resilience.circuit_breaker_enabled || self.circuit_breaker.can_execute(provider)
    }

    /// Records the outcome of one attempt against both the breaker and
    /// the monitor, firing the heal hook if the monitor decides this is
    /// the error that should trigger a cycle.
    fn record_failure(&self, provider: &str, error: &ProviderError) {
        self.circuit_breaker.record_failure(provider);
        if let Some(recent) = self.health_monitor.record_error(provider, error) {
            if !self.registry.config().resilience.self_healing_enabled {
                return;
            }
            if let Some(hook) = self.heal_hook.read().unwrap().as_ref() {
                hook(provider.to_string(), recent);
            }
        }
    }

    fn record_success(&self, provider: &str) {
        self.circuit_breaker.record_success(provider);
        self.health_monitor.record_success(provider);
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let resolved = resolve_model(self.registry.config(), &request.model)
            .ok_or_else(|| GatewayError::NoProvidersAvailable(request.model.clone()))?;

        let mut last_error = None;
        for (attempt, provider_name) in self.candidate_order(&resolved.provider).into_iter().enumerate() {
            if !self.can_execute(&provider_name) {
                warn!(provider = %provider_name, "circuit open, skipping");
                continue;
            }
            let Ok(provider) = self.registry.get(&provider_name) else { continue };
            let mut attempt_request = request.clone();
            attempt_request.model = if attempt == 0 { resolved.model.clone() } else { provider.default_model().to_string() };

            let start = Instant::now();
            match provider.chat(&attempt_request).await {
                Ok(mut response) => {
                    self.record_success(&provider_name);
                    if attempt > 0 {
                        response.lineage = response.lineage.with_fallback_from(resolved.provider.clone());
                    }
                    info!(provider = %provider_name, latency_ms = start.elapsed().as_millis(), "chat ok");
                    return Ok(response);
                }
                Err(error) => {
                    self.record_failure(&provider_name, &error);
                    let gateway_error = GatewayError::Provider(error);
                    let fallback_eligible = should_fallback(&gateway_error);
                    warn!(provider = %provider_name, error = %gateway_error, fallback = fallback_eligible, "chat failed");
                    last_error = Some(gateway_error);
                    if !fallback_eligible {
                        return Err(last_error.unwrap());
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| GatewayError::NoProvidersAvailable(request.model.clone())))
    }

    pub async fn chat_stream(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatStreamEvent>>> {
        let resolved = resolve_model(self.registry.config(), &request.model)
            .ok_or_else(|| GatewayError::NoProvidersAvailable(request.model.clone()))?;
        if !self.can_execute(&resolved.provider) {
            return Err(GatewayError::CircuitOpen(resolved.provider));
        }
        let provider = self.registry.get(&resolved.provider)?;
        let mut request = request;
        request.model = resolved.model;
        let provider_name = resolved.provider.clone();
        match provider.chat_stream(&request).await {
            Ok(stream) => {
                self.record_success(&provider_name);
                use futures::StreamExt;
                Ok(Box::pin(stream.map(|event| event.map_err(GatewayError::Provider))))
            }
            Err(error) => {
                self.record_failure(&provider_name, &error);
                Err(GatewayError::Provider(error))
            }
        }
    }

    /// Embeddings never fall back (spec §4.9): the caller asked for a
    /// specific model's vector space, and a different provider's
    /// embedding is not interchangeable.
    pub async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let resolved = resolve_model(self.registry.config(), &request.model)
            .ok_or_else(|| GatewayError::NoProvidersAvailable(request.model.clone()))?;
        if !self.can_execute(&resolved.provider) {
            return Err(GatewayError::CircuitOpen(resolved.provider));
        }
        let provider = self.registry.get(&resolved.provider)?;
        let mut request = request;
        request.model = resolved.model;
        match provider.embed(&request).await {
            Ok(response) => {
                self.record_success(&resolved.provider);
                Ok(response)
            }
            Err(error) => {
                self.record_failure(&resolved.provider, &error);
                Err(match error {
                    ProviderError::UnsupportedOperation { .. } => GatewayError::Provider(error),
                    other => GatewayError::Provider(other),
                })
            }
        }
    }
}

/// Helper for building a heal hook that upgrades a [`Weak<Router>`] so the
/// hook closure captured inside the Router it fires does not keep the
/// Router alive by a strong reference (which would never drop for the
/// lifetime of the process — harmless for a singleton, but the `Weak`
/// keeps the ownership story honest: the hook observes the Router, it
/// doesn't own it).
pub fn weak_router(router: &Arc<Router>) -> Weak<Router> {
    Arc::downgrade(router)
}

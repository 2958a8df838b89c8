//! Shared application state handed to every actix-web handler, following
//! the teacher's `server/state.rs` `AppState` pattern.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::core::circuit_breaker::CircuitBreaker;
use crate::core::heal::HealWorker;
use crate::core::health::HealthMonitor;
use crate::core::registry::ProviderRegistry;
use crate::core::reload::ReloadManager;
use crate::core::router::Router;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub registry: Arc<ProviderRegistry>,
    pub router: Arc<Router>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub health_monitor: Arc<HealthMonitor>,
    pub reload_manager: Arc<ReloadManager>,
    pub heal_worker: Arc<HealWorker>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ProviderRegistry::new((*config).clone()));
        let circuit_breaker = Arc::new(CircuitBreaker::new(crate::core::circuit_breaker::CircuitBreakerConfig {
            failure_threshold: config.resilience.circuit_failure_threshold,
            recovery_timeout: std::time::Duration::from_secs(config.resilience.circuit_recovery_timeout_secs),
            success_threshold: config.resilience.circuit_success_threshold,
        }));
        let health_monitor = Arc::new(HealthMonitor::new(
            std::time::Duration::from_secs(config.resilience.health_window_secs),
            config.resilience.health_error_threshold,
            std::time::Duration::from_secs(config.resilience.heal_cooldown_secs),
        ));
        let router = Arc::new(Router::new(registry.clone(), circuit_breaker.clone(), health_monitor.clone()));
        let reload_manager = Arc::new(ReloadManager::new(
            registry.clone(),
            config.resilience.auto_apply_threshold,
            config.resilience.auto_apply_fixes,
            None,
        ));
        let heal_worker = Arc::new(HealWorker::new(
            config.resilience.heal_model.clone(),
            config.providers.iter().find(|p| p.priority == crate::config::ProviderPriority::Primary).map(|p| p.name.clone()).unwrap_or_else(|| "anthropic".to_string()),
            config.research_fallback_providers.clone(),
        ));
        let metrics = Arc::new(Metrics::new());

        if config.resilience.self_healing_enabled {
            let weak_router = crate::core::router::weak_router(&router);
            let heal_worker = heal_worker.clone();
            let reload_manager = reload_manager.clone();
            let health_monitor = health_monitor.clone();
            router.set_heal_hook(Arc::new(move |provider: String, errors| {
                let weak_router = weak_router.clone();
                let heal_worker = heal_worker.clone();
                let reload_manager = reload_manager.clone();
                let health_monitor = health_monitor.clone();
                tokio::spawn(async move {
                    let Some(router) = weak_router.upgrade() else { return };
                    let outcome = heal_worker.heal(&router, &reload_manager, &provider, &errors).await;
                    let success = matches!(
                        outcome,
                        Ok(crate::core::heal::HealOutcome::FixProposed) | Ok(crate::core::heal::HealOutcome::NoFixNeeded)
                    );
                    if let Err(error) = &outcome {
                        tracing::warn!(%provider, %error, "heal cycle errored");
                    }
                    health_monitor.handle_heal_complete(&provider, success);
                });
            }));
        }

        AppState { config, registry, router, circuit_breaker, health_monitor, reload_manager, heal_worker, metrics }
    }
}

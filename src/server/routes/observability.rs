//! `GET /metrics` (Prometheus text exposition) and `GET /dashboard` (spec
//! §4.9): the latter is a pure aggregation of circuit states, health
//! summary, pending-fix count, and a metrics snapshot, grounded on
//! `original_source/aratta/server.py`'s single dashboard handler.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use crate::server::state::AppState;

pub async fn metrics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(state.metrics.render()))
}

#[derive(Debug, Serialize)]
struct DashboardProvider {
    provider: String,
    enabled: bool,
    circuit_state: crate::core::circuit_breaker::CircuitState,
    consecutive_failures: u32,
    is_healing: bool,
    is_paused: bool,
    latency_p50_ms: Option<u64>,
    latency_p99_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Dashboard {
    providers: Vec<DashboardProvider>,
    pending_fixes: usize,
}

pub async fn dashboard(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let providers = state
        .config
        .providers
        .iter()
        .map(|p| {
            let (p50, p99) = state
                .metrics
                .latency_summary(&p.name)
                .map(|(_, p50, p99)| (Some(p50), Some(p99)))
                .unwrap_or((None, None));
            DashboardProvider {
                provider: p.name.clone(),
                enabled: p.enabled,
                circuit_state: state.circuit_breaker.state(&p.name),
                consecutive_failures: state.health_monitor.consecutive_failures(&p.name),
                is_healing: state.health_monitor.is_healing(&p.name),
                is_paused: state.health_monitor.is_paused(&p.name),
                latency_p50_ms: p50,
                latency_p99_ms: p99,
            }
        })
        .collect();
    let pending_fixes = state.reload_manager.pending_fixes().len();
    Ok(HttpResponse::Ok().json(Dashboard { providers, pending_fixes }))
}

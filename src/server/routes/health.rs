//! `GET /health` (liveness) and `GET /api/v1/health` (per-provider health
//! plus circuit states), spec §4.9.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
struct Liveness {
    status: &'static str,
}

pub async fn liveness() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(Liveness { status: "ok" }))
}

#[derive(Debug, Serialize)]
struct ProviderHealthEntry {
    provider: String,
    enabled: bool,
    circuit_state: crate::core::circuit_breaker::CircuitState,
    consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    recovery_time_secs: Option<u64>,
    is_healing: bool,
    is_paused: bool,
}

#[derive(Debug, Serialize)]
struct DetailedHealth {
    status: &'static str,
    providers: Vec<ProviderHealthEntry>,
}

pub async fn detailed(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let providers = state
        .config
        .providers
        .iter()
        .map(|p| ProviderHealthEntry {
            provider: p.name.clone(),
            enabled: p.enabled,
            circuit_state: state.circuit_breaker.state(&p.name),
            consecutive_failures: state.health_monitor.consecutive_failures(&p.name),
            recovery_time_secs: state.circuit_breaker.recovery_time_secs(&p.name),
            is_healing: state.health_monitor.is_healing(&p.name),
            is_paused: state.health_monitor.is_paused(&p.name),
        })
        .collect();
    Ok(HttpResponse::Ok().json(DetailedHealth { status: "ok", providers }))
}

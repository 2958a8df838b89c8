//! Healing status and pause/resume per provider (spec §4.9, supplemented
//! feature in SPEC_FULL.md — the Health Monitor's opt-out set).

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
struct HealingEntry {
    provider: String,
    is_healing: bool,
    is_paused: bool,
    consecutive_failures: u32,
}

#[derive(Debug, Serialize)]
struct HealingStatus {
    providers: Vec<HealingEntry>,
}

pub async fn status(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let providers = state
        .config
        .providers
        .iter()
        .map(|p| HealingEntry {
            provider: p.name.clone(),
            is_healing: state.health_monitor.is_healing(&p.name),
            is_paused: state.health_monitor.is_paused(&p.name),
            consecutive_failures: state.health_monitor.consecutive_failures(&p.name),
        })
        .collect();
    Ok(HttpResponse::Ok().json(HealingStatus { providers }))
}

pub async fn pause(state: web::Data<AppState>, provider: web::Path<String>) -> ActixResult<HttpResponse> {
    state.health_monitor.pause(&provider);
    Ok(HttpResponse::Ok().finish())
}

pub async fn resume(state: web::Data<AppState>, provider: web::Path<String>) -> ActixResult<HttpResponse> {
    state.health_monitor.resume(&provider);
    Ok(HttpResponse::Ok().finish())
}

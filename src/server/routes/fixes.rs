//! Fix controls (spec §4.9): `GET /fixes/pending`, `POST /fixes/{p}/approve`,
//! `POST /fixes/{p}/reject?reason=`, `GET /fixes/{p}/history`,
//! `POST /fixes/{p}/rollback/{version}`.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Deserialize;

use crate::server::errors::gateway_error_to_response;
use crate::server::state::AppState;

pub async fn pending(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.reload_manager.pending_fixes()))
}

pub async fn approve(state: web::Data<AppState>, provider: web::Path<String>) -> ActixResult<HttpResponse> {
    match state.reload_manager.approve(&provider).await {
        Ok(()) => Ok(HttpResponse::Ok().finish()),
        Err(error) => Ok(gateway_error_to_response(error)),
    }
}

#[derive(Debug, Deserialize)]
pub struct RejectQuery {
    #[serde(default)]
    reason: String,
}

pub async fn reject(
    state: web::Data<AppState>,
    provider: web::Path<String>,
    query: web::Query<RejectQuery>,
) -> ActixResult<HttpResponse> {
    match state.reload_manager.reject(&provider, &query.reason) {
        Ok(()) => Ok(HttpResponse::Ok().finish()),
        Err(error) => Ok(gateway_error_to_response(error)),
    }
}

pub async fn history(state: web::Data<AppState>, provider: web::Path<String>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.reload_manager.history(&provider)))
}

pub async fn rollback(
    state: web::Data<AppState>,
    path: web::Path<(String, u32)>,
) -> ActixResult<HttpResponse> {
    let (provider, version) = path.into_inner();
    match state.reload_manager.rollback(&provider, version) {
        Ok(()) => Ok(HttpResponse::Ok().finish()),
        Err(error) => Ok(gateway_error_to_response(error)),
    }
}

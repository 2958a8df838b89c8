//! `POST /circuit/{p}/{open|close|reset}` (spec §4.9): manual circuit
//! breaker overrides for an operator dealing with a known-bad or
//! known-recovered provider.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;

use crate::server::errors::validation_error;
use crate::server::state::AppState;

pub async fn control(state: web::Data<AppState>, path: web::Path<(String, String)>) -> ActixResult<HttpResponse> {
    let (provider, action) = path.into_inner();
    match action.as_str() {
        "open" => state.circuit_breaker.force_open(&provider),
        "close" => state.circuit_breaker.force_close(&provider),
        "reset" => state.circuit_breaker.reset(&provider),
        other => return Ok(validation_error(&format!("unknown circuit action '{other}'"))),
    }
    Ok(HttpResponse::Ok().json(json!({ "provider": provider, "state": state.circuit_breaker.state(&provider) })))
}

//! Maps a [`GatewayError`] onto an HTTP response, following the teacher's
//! `server/routes/errors.rs` `gateway_error_to_response` pattern.

use actix_web::HttpResponse;
use serde_json::json;

use crate::utils::error::{status_code, GatewayError};

pub fn gateway_error_to_response(error: GatewayError) -> HttpResponse {
    let status = status_code(&error);
    let body = json!({ "error": { "message": error.to_string() } });
    HttpResponse::build(actix_web::http::StatusCode::from_u16(status).unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)).json(body)
}

pub fn validation_error(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": { "message": message } }))
}

//! `POST /embed` (spec §4.9). No fallback: embedding vector spaces vary
//! across providers, so a fallback response would be silently wrong.

use std::time::Instant;

use actix_web::{web, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use crate::core::resolver::resolve_model;
use crate::core::types::EmbeddingRequest;
use crate::server::errors::gateway_error_to_response;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;

pub async fn embed(state: web::Data<AppState>, request: web::Json<EmbeddingRequest>) -> ActixResult<HttpResponse> {
    info!(model = %request.model, "embed request");
    let start = Instant::now();
    let provider = resolve_model(&state.config, &request.model).map(|r| r.provider);
    match state.router.embed(request.into_inner()).await {
        Ok(response) => {
            if let Some(provider) = &provider {
                state.metrics.record_request(provider, true, start.elapsed().as_millis() as u64);
            }
            Ok(HttpResponse::Ok().json(response))
        }
        Err(error) => {
            error!(%error, "embed failed");
            if let GatewayError::Provider(provider_error) = &error {
                state.metrics.record_request(provider_error.provider(), false, start.elapsed().as_millis() as u64);
            }
            Ok(gateway_error_to_response(error))
        }
    }
}

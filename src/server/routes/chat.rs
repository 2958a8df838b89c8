//! `POST /chat` and `POST /chat/stream` (spec §4.9).

use std::time::Instant;

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{web, HttpResponse, Result as ActixResult};
use futures::StreamExt;
use tracing::{error, info};

use crate::core::types::{ChatRequest, ChatStreamEvent, FinishReason, Usage};
use crate::server::errors::gateway_error_to_response;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;

pub async fn chat(state: web::Data<AppState>, request: web::Json<ChatRequest>) -> ActixResult<HttpResponse> {
    info!(model = %request.model, "chat request");
    let start = Instant::now();
    match state.router.chat(request.into_inner()).await {
        Ok(response) => {
            state.metrics.record_request(&response.lineage.provider, true, start.elapsed().as_millis() as u64);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(error) => {
            error!(%error, "chat failed");
            if let GatewayError::Provider(provider_error) = &error {
                state.metrics.record_request(provider_error.provider(), false, start.elapsed().as_millis() as u64);
            }
            Ok(gateway_error_to_response(error))
        }
    }
}

pub async fn chat_stream(state: web::Data<AppState>, request: web::Json<ChatRequest>) -> ActixResult<HttpResponse> {
    let mut request = request.into_inner();
    request.stream = true;
    info!(model = %request.model, "streaming chat request");

    match state.router.chat_stream(request).await {
        Ok(mut stream) => {
            let body = async_stream::stream! {
                while let Some(event) = stream.next().await {
                    match event {
                        Ok(event) => {
                            let json = serde_json::to_string(&event).unwrap_or_default();
                            yield Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {json}\n\n")));
                            if matches!(event, ChatStreamEvent::Stop { .. }) {
                                yield Ok::<_, actix_web::Error>(web::Bytes::from("data: [DONE]\n\n"));
                            }
                        }
                        Err(error) => {
                            error!(%error, "stream error");
                            let stop = ChatStreamEvent::Stop { finish_reason: FinishReason::Error, usage: Usage::default() };
                            let json = serde_json::to_string(&stop).unwrap_or_default();
                            yield Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {json}\n\n")));
                            yield Ok::<_, actix_web::Error>(web::Bytes::from("data: [DONE]\n\n"));
                            break;
                        }
                    }
                }
            };
            Ok(HttpResponse::Ok()
                .insert_header((CONTENT_TYPE, "text/event-stream"))
                .insert_header((CACHE_CONTROL, "no-cache"))
                .insert_header(("Connection", "keep-alive"))
                .streaming(body))
        }
        Err(error) => {
            error!(%error, "failed to start stream");
            Ok(gateway_error_to_response(error))
        }
    }
}

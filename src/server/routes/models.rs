//! `GET /models` (spec §4.9): aggregates `get_models()` across every
//! enabled provider plus the alias table.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
struct ModelsResponse {
    models: Vec<crate::core::types::ModelCapabilities>,
    aliases: Vec<AliasEntry>,
}

#[derive(Debug, Serialize)]
struct AliasEntry {
    alias: String,
    provider: String,
    model: String,
}

pub async fn list_models(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let mut models = Vec::new();
    for provider_config in state.config.enabled_providers() {
        if let Ok(provider) = state.registry.get(&provider_config.name) {
            models.extend(provider.models());
        }
    }
    let aliases = crate::config::defaults::default_model_aliases()
        .into_iter()
        .map(|(alias, provider, model)| AliasEntry {
            alias: alias.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
        })
        .collect();
    Ok(HttpResponse::Ok().json(ModelsResponse { models, aliases }))
}

//! HTTP route modules (spec §4.9), one file per resource.

pub mod chat;
pub mod circuit;
pub mod embed;
pub mod fixes;
pub mod healing;
pub mod health;
pub mod models;
pub mod observability;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/chat", web::post().to(chat::chat))
        .route("/chat/stream", web::post().to(chat::chat_stream))
        .route("/embed", web::post().to(embed::embed))
        .route("/models", web::get().to(models::list_models))
        .route("/health", web::get().to(health::liveness))
        .route("/api/v1/health", web::get().to(health::detailed))
        .route("/circuit/{provider}/{action}", web::post().to(circuit::control))
        .route("/fixes/pending", web::get().to(fixes::pending))
        .route("/fixes/{provider}/approve", web::post().to(fixes::approve))
        .route("/fixes/{provider}/reject", web::post().to(fixes::reject))
        .route("/fixes/{provider}/history", web::get().to(fixes::history))
        .route("/fixes/{provider}/rollback/{version}", web::post().to(fixes::rollback))
        .route("/healing/status", web::get().to(healing::status))
        .route("/healing/{provider}/pause", web::post().to(healing::pause))
        .route("/healing/{provider}/resume", web::post().to(healing::resume))
        .route("/metrics", web::get().to(observability::metrics))
        .route("/dashboard", web::get().to(observability::dashboard));
}

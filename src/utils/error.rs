//! Gateway-wide error type, mirroring the teacher's `GatewayError`
//! (`utils/error/error/types.rs`) trimmed to the taxonomy spec.md §7
//! actually needs.

use thiserror::Error;

use crate::core::providers::ProviderError;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("no healthy provider available for model {0}")]
    NoProvidersAvailable(String),

    #[error("circuit open for provider {0}")]
    CircuitOpen(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal(message.into())
    }
}

/// Whether a failure should trigger the Router's fallback walk (spec §4.4,
/// §7): rate limits and client-input errors fail fast instead.
pub fn should_fallback(error: &GatewayError) -> bool {
    match error {
        GatewayError::Provider(ProviderError::RateLimit { .. }) => false,
        GatewayError::Provider(ProviderError::Authentication { .. }) => false,
        GatewayError::Provider(ProviderError::ModelNotFound { .. }) => false,
        GatewayError::Provider(ProviderError::UnsupportedOperation { .. }) => false,
        GatewayError::Provider(ProviderError::InvalidRequest { .. }) => false,
        GatewayError::Provider(ProviderError::Transport { .. }) => true,
        GatewayError::CircuitOpen(_) => true,
        _ => false,
    }
}

/// HTTP status for a given error (spec §7 table).
pub fn status_code(error: &GatewayError) -> u16 {
    match error {
        GatewayError::Provider(ProviderError::Authentication { .. }) => 502,
        GatewayError::Provider(ProviderError::RateLimit { .. }) => 429,
        GatewayError::Provider(ProviderError::ModelNotFound { .. }) => 404,
        GatewayError::Provider(ProviderError::UnsupportedOperation { .. }) => 400,
        GatewayError::Provider(ProviderError::InvalidRequest { .. }) => 400,
        GatewayError::Provider(ProviderError::Transport { .. }) => 502,
        GatewayError::BadRequest(_) => 400,
        GatewayError::NotFound(_) => 404,
        GatewayError::NoProvidersAvailable(_) => 503,
        GatewayError::CircuitOpen(_) => 503,
        GatewayError::Config(_) | GatewayError::Internal(_) => 500,
        GatewayError::Serialization(_) | GatewayError::Io(_) => 500,
    }
}

//! Server builder and `run_server` entry point, mirroring the teacher's
//! `server/builder.rs` split between a `ServerBuilder` and a free function
//! that auto-loads config.

use actix_cors::Cors;
use actix_web::{web, App, HttpServer as ActixHttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::GatewayConfig;
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};

/// Builds the actix-web app: CORS, request tracing, and every route under
/// [`routes::configure`].
fn create_app(
    state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .wrap(Cors::permissive())
        .wrap(TracingLogger::default())
        .configure(routes::configure)
}

pub struct ServerBuilder {
    config: Option<GatewayConfig>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        ServerBuilder { config: None }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config.ok_or_else(|| GatewayError::Config("configuration is required".to_string()))?;
        run(config).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(config: GatewayConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = web::Data::new(AppState::new(config));

    info!(address = %bind_addr, "starting gateway server");
    ActixHttpServer::new(move || create_app(state.clone()))
        .bind(&bind_addr)
        .map_err(|e| GatewayError::Internal(format!("binding {bind_addr}: {e}")))?
        .run()
        .await
        .map_err(|e| GatewayError::Internal(format!("server error: {e}")))?;
    Ok(())
}

/// Loads `$ARATTA_HOME/config.yaml` (or `$ARATTA_CONFIG` if set) if
/// present, applies env overrides, and starts the server. Falls back to
/// built-in defaults when no config file is found, matching the teacher's
/// `run_server` auto-discovery.
pub async fn run_server() -> Result<()> {
    let config_path = std::env::var("ARATTA_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| crate::config::gateway_home().join("config.yaml"));
    let config = match GatewayConfig::from_file(&config_path).await {
        Ok(config) => {
            info!(path = %config_path.display(), "loaded configuration file");
            config
        }
        Err(error) => {
            info!(%error, path = %config_path.display(), "no configuration file, using built-in defaults");
            GatewayConfig::default()
        }
    }
    .apply_env_overrides();

    run(config).await
}

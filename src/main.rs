//! aratta-gateway — universal AI-provider gateway process entry point.

use std::process::ExitCode;

use clap::Parser;

/// Universal AI-provider gateway.
#[derive(Debug, Parser)]
#[command(name = "gateway", version = aratta_gateway::VERSION)]
struct Cli {
    /// Path to a YAML config file. Defaults to `$ARATTA_HOME/config.yaml`.
    #[arg(long, env = "ARATTA_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let home = aratta_gateway::config::gateway_home();
    dotenvy::from_path(home.join(".env")).ok();
    dotenvy::dotenv().ok();

    aratta_gateway::utils::logging::init();

    let cli = Cli::parse();
    if let Some(config) = &cli.config {
        std::env::set_var("ARATTA_CONFIG", config);
    }

    match aratta_gateway::server::run_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

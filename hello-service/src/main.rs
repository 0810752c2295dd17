use clap::Parser;
use hello_service::cli::{check_health, health_url, Cli, Command};
use hello_service::config::HelloConfig;
use hello_service::services::init_metrics;
use hello_service::startup::Application;
use hello_service::SERVICE_NAME;
use service_core::observability::init_tracing;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match HelloConfig::load(cli.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command() {
        Command::Health => health(&config).await,
        Command::Server => match server(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Server error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn health(config: &HelloConfig) -> ExitCode {
    let url = health_url(config);
    match check_health(&url).await {
        Ok(()) => {
            println!("{} is healthy ({})", SERVICE_NAME, url);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} is unhealthy ({}): {}", SERVICE_NAME, url, e);
            ExitCode::FAILURE
        }
    }
}

async fn server(config: HelloConfig) -> std::io::Result<()> {
    // Initialize tracing
    init_tracing(SERVICE_NAME, &config.common.log);

    // Initialize metrics
    if let Err(e) = init_metrics() {
        tracing::warn!("Metrics disabled: {}", e);
    }

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    tracing::info!("Hello service listening on port {}", app.port());

    app.run_until_stopped().await
}

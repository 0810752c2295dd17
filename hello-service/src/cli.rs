//! Command line interface: `server` (the default) and `health`.

use crate::config::HelloConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "hello-service",
    version,
    about = "Greeting service backed by the settings service"
)]
pub struct Cli {
    /// Read configuration from FILE instead of the search paths
    #[arg(short, long, value_name = "FILE", env = "APP_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the service
    Server,
    /// Check the health of a running instance
    Health,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Server)
    }
}

/// Where a running instance answers health checks: the debug listener when
/// configured, otherwise the main one.
pub fn health_url(config: &HelloConfig) -> String {
    let port = config.common.debug_port.unwrap_or(config.common.port);
    format!("http://127.0.0.1:{}/health", port)
}

/// GET `url` and require a 2xx reply.
pub async fn check_health(url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("health check returned {}", response.status());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_server() {
        let cli = Cli::try_parse_from(["hello-service"]).unwrap();
        assert_eq!(cli.command(), Command::Server);
    }

    #[test]
    fn health_accepts_a_config_file() {
        let cli =
            Cli::try_parse_from(["hello-service", "health", "--config-file", "/tmp/hello.toml"])
                .unwrap();

        assert_eq!(cli.command(), Command::Health);
        assert_eq!(cli.config_file, Some(PathBuf::from("/tmp/hello.toml")));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["hello-service", "serve-forever"]).is_err());
    }

    #[test]
    fn health_url_prefers_the_debug_port() {
        use crate::config::{RegistrationConfig, SettingsServiceConfig};
        use crate::services::BundleIdentifiers;
        use service_core::config::{Config as CoreConfig, LogSettings};

        let mut config = HelloConfig {
            common: CoreConfig {
                port: 9105,
                debug_port: None,
                log: LogSettings::default(),
            },
            settings_service: SettingsServiceConfig {
                url: "http://localhost:9190".to_string(),
                connect_timeout_secs: 2,
                request_timeout_secs: 5,
            },
            registration: RegistrationConfig {
                enabled: true,
                max_retries: 5,
                backoff_ms: 0,
                identifiers: BundleIdentifiers::default(),
            },
        };
        assert_eq!(health_url(&config), "http://127.0.0.1:9105/health");

        config.common.debug_port = Some(9109);
        assert_eq!(health_url(&config), "http://127.0.0.1:9109/health");
    }

    #[tokio::test]
    async fn health_check_fails_when_nothing_listens() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = check_health(&format!("http://127.0.0.1:{}/health", port)).await;
        assert!(result.is_err());
    }
}

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Settings shared by every service: listener port and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Separate listener for health and metrics. Off when unset.
    #[serde(default)]
    pub debug_port: Option<u16>,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// OTLP collector endpoint. Span export is off when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            otlp_endpoint: None,
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load `config_file` if given, otherwise every file found on
    /// [`search_paths`], then overlay `APP__*` environment variables.
    ///
    /// An explicit file must exist. Search-path files are optional and later
    /// entries override earlier ones.
    pub fn load(service_name: &str, config_file: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let mut builder = Cfg::builder();
        match config_file {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                for base in search_paths(service_name) {
                    builder = builder
                        .add_source(File::with_name(&base.to_string_lossy()).required(false));
                }
            }
        }

        let config = builder
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Config file stems tried when no file is named, lowest precedence first:
/// `/etc/ocis/<name>`, `$HOME/.ocis/<name>`, `./config/<name>`. Any
/// extension the `config` crate understands is accepted.
pub fn search_paths(service_name: &str) -> Vec<PathBuf> {
    let mut paths = vec![Path::new("/etc/ocis").join(service_name)];
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".ocis").join(service_name));
    }
    paths.push(Path::new("config").join(service_name));
    paths
}

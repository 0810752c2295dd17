use crate::services::bundles::{self, BundleIdentifiers};
use crate::services::registrar::RegistrarConfig;
use crate::SERVICE_NAME;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HelloConfig {
    pub common: core_config::Config,
    pub settings_service: SettingsServiceConfig,
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone)]
pub struct SettingsServiceConfig {
    /// Base URL of the settings service HTTP gateway.
    pub url: String,
    pub connect_timeout_secs: u64,
    /// Upper bound for a single settings call, including phrase lookups on
    /// the greet path.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Register the settings bundle at startup.
    pub enabled: bool,
    pub max_retries: u32,
    /// Pause before the first retry; 0 retries immediately.
    pub backoff_ms: u64,
    pub identifiers: BundleIdentifiers,
}

impl RegistrationConfig {
    pub fn retry_config(&self) -> RetryConfig {
        if self.backoff_ms == 0 {
            RetryConfig::immediate(self.max_retries)
        } else {
            RetryConfig::exponential(self.max_retries, Duration::from_millis(self.backoff_ms))
        }
    }

    pub fn registrar_config(&self) -> RegistrarConfig {
        RegistrarConfig::new(self.identifiers.clone(), self.retry_config())
    }
}

impl HelloConfig {
    /// Core settings come from `config_file` (or the search paths) and
    /// `APP__*`; service settings come from plain environment variables.
    pub fn load(config_file: Option<&Path>) -> Result<Self, AppError> {
        let common_config = core_config::Config::load(SERVICE_NAME, config_file)?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(HelloConfig {
            common: common_config,
            settings_service: SettingsServiceConfig {
                url: get_env("SETTINGS_SERVICE_URL", Some("http://localhost:9190"), is_prod)?,
                connect_timeout_secs: parse_env("SETTINGS_CONNECT_TIMEOUT_SECS", "2", is_prod)?,
                request_timeout_secs: parse_env("SETTINGS_REQUEST_TIMEOUT_SECS", "5", is_prod)?,
            },
            registration: RegistrationConfig {
                enabled: parse_env("REGISTRATION_ENABLED", "true", is_prod)?,
                max_retries: parse_env("REGISTRATION_MAX_RETRIES", "5", is_prod)?,
                backoff_ms: parse_env("REGISTRATION_BACKOFF_MS", "0", is_prod)?,
                identifiers: BundleIdentifiers {
                    greeting_bundle_id: get_env(
                        "GREETING_BUNDLE_ID",
                        Some(bundles::BUNDLE_ID_GREETING),
                        is_prod,
                    )?,
                    phrase_setting_id: get_env(
                        "PHRASE_SETTING_ID",
                        Some(bundles::SETTING_ID_GREETER_PHRASE),
                        is_prod,
                    )?,
                    phrase_permission_id: get_env(
                        "PHRASE_PERMISSION_ID",
                        Some(bundles::SETTING_ID_PHRASE_PERMISSION),
                        is_prod,
                    )?,
                    admin_role_bundle_id: get_env(
                        "ADMIN_ROLE_BUNDLE_ID",
                        Some(bundles::BUNDLE_ID_ROLE_ADMIN),
                        is_prod,
                    )?,
                },
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(default), is_prod)?;
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

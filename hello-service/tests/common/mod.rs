#![allow(dead_code)]

use hello_service::config::{HelloConfig, RegistrationConfig, SettingsServiceConfig};
use hello_service::services::bundles::{greeting_bundle, permission_grants, BundleIdentifiers};
use hello_service::startup::Application;
use serde_json::json;
use service_core::config::{Config as CoreConfig, LogSettings};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_ACCOUNT_UUID: &str = "4c510ada-c86b-4815-8820-42cdf82c3d51";

pub const BUNDLE_SAVE: &str = "/api/v0/settings/bundle-save";
pub const ADD_SETTING: &str = "/api/v0/settings/bundles-add-setting";
pub const GET_VALUE: &str = "/api/v0/settings/values-get-by-unique-identifiers";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub debug_port: Option<u16>,
    /// Stand-in for the settings service.
    pub settings: MockServer,
    shutdown: CancellationToken,
}

impl TestApp {
    /// Spawn the app against a settings service that accepts registration.
    pub async fn spawn() -> Self {
        let settings = MockServer::start().await;
        mount_registration_success(&settings).await;
        Self::spawn_with_settings(settings, true).await
    }

    pub async fn spawn_with_settings(settings: MockServer, registration_enabled: bool) -> Self {
        let config = test_config(&settings, registration_enabled, None);
        Self::spawn_with_config(settings, config).await
    }

    /// Spawn with health and metrics also served on a separate debug port.
    pub async fn spawn_with_debug_listener() -> Self {
        let settings = MockServer::start().await;
        mount_registration_success(&settings).await;
        let config = test_config(&settings, true, Some(0));
        Self::spawn_with_config(settings, config).await
    }

    async fn spawn_with_config(settings: MockServer, config: HelloConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let debug_port = app.debug_port();
        let address = format!("http://127.0.0.1:{}", port);
        let shutdown = app.shutdown_token();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            debug_port,
            settings,
            shutdown,
        }
    }

    pub async fn greet(&self, name: &str, account: Option<&str>) -> reqwest::Response {
        let mut request = reqwest::Client::new()
            .post(format!("{}/api/v0/greet", self.address))
            .json(&json!({ "name": name }));
        if let Some(account) = account {
            request = request.header("x-account-uuid", account);
        }
        request.send().await.expect("Failed to execute request")
    }

    /// Number of calls the settings service received on `route`.
    pub async fn settings_calls(&self, route: &str) -> usize {
        self.settings
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == route)
            .count()
    }

    /// Poll until `route` has seen at least `expected` calls or two seconds pass.
    pub async fn wait_for_calls(&self, route: &str, expected: usize) -> usize {
        let mut seen = 0;
        for _ in 0..40 {
            seen = self.settings_calls(route).await;
            if seen >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        seen
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn test_config(
    settings: &MockServer,
    registration_enabled: bool,
    debug_port: Option<u16>,
) -> HelloConfig {
    HelloConfig {
        common: CoreConfig {
            port: 0,
            debug_port,
            log: LogSettings::default(),
        },
        settings_service: SettingsServiceConfig {
            url: settings.uri(),
            connect_timeout_secs: 1,
            request_timeout_secs: 2,
        },
        registration: RegistrationConfig {
            enabled: registration_enabled,
            max_retries: 5,
            backoff_ms: 0,
            identifiers: BundleIdentifiers::default(),
        },
    }
}

/// Echo back the default bundle and permission on save.
pub async fn mount_registration_success(server: &MockServer) {
    let ids = BundleIdentifiers::default();
    let bundle = greeting_bundle(&ids);
    let permission = permission_grants(&ids).remove(0).setting;

    Mock::given(method("POST"))
        .and(path(BUNDLE_SAVE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bundle": bundle })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(ADD_SETTING))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "setting": permission })),
        )
        .mount(server)
        .await;
}

/// Reply to phrase lookups with `phrase` as the account's string value.
pub async fn mount_phrase(server: &MockServer, phrase: &str) {
    Mock::given(method("POST"))
        .and(path(GET_VALUE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": {
                "identifier": {
                    "extension": "ocis-hello",
                    "bundle": "greeting",
                    "setting": "phrase"
                },
                "value": { "accountUuid": TEST_ACCOUNT_UUID, "stringValue": phrase }
            }
        })))
        .mount(server)
        .await;
}

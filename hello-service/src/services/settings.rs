//! Settings service client.
//!
//! Talks to the settings service HTTP gateway, which exposes every RPC as
//! `POST /api/v0/settings/<method>` with a JSON body.

use crate::config::SettingsServiceConfig;
use crate::models::settings::ValueDto;
use crate::models::{Bundle, Setting, SettingValue};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use service_core::observability::outbound_headers;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("settings service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid settings service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("settings service response is missing `{0}`")]
    MissingField(&'static str),
}

/// The calls this service makes against the settings service.
#[async_trait]
pub trait SettingsService: Send + Sync {
    /// Current value of `setting_id` for `account_uuid`.
    async fn get_value_by_unique_identifiers(
        &self,
        account_uuid: &str,
        setting_id: &str,
        request_id: Option<&str>,
    ) -> Result<SettingValue, SettingsError>;

    /// Upsert a bundle; the service echoes back what it persisted.
    async fn save_bundle(&self, bundle: &Bundle) -> Result<Bundle, SettingsError>;

    /// Add (or replace) a setting inside an existing bundle.
    async fn add_setting_to_bundle(
        &self,
        bundle_id: &str,
        setting: &Setting,
    ) -> Result<Setting, SettingsError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetValueByUniqueIdentifiersRequest<'a> {
    account_uuid: &'a str,
    setting_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct GetValueResponse {
    value: Option<ValueWithIdentifier>,
}

#[derive(Debug, Deserialize)]
struct ValueWithIdentifier {
    value: Option<ValueDto>,
}

#[derive(Debug, Serialize)]
struct SaveBundleRequest<'a> {
    bundle: &'a Bundle,
}

#[derive(Debug, Deserialize)]
struct SaveBundleResponse {
    bundle: Option<Bundle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddSettingToBundleRequest<'a> {
    bundle_id: &'a str,
    setting: &'a Setting,
}

#[derive(Debug, Deserialize)]
struct AddSettingToBundleResponse {
    setting: Option<Setting>,
}

/// reqwest-backed [`SettingsService`].
#[derive(Clone)]
pub struct HttpSettingsClient {
    client: Client,
    base_url: String,
}

impl HttpSettingsClient {
    pub fn new(config: &SettingsServiceConfig) -> Result<Self, SettingsError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<B, R>(
        &self,
        method: &str,
        body: &B,
        request_id: Option<&str>,
    ) -> Result<R, SettingsError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/api/v0/settings/{}", self.base_url, method);

        let response = self
            .client
            .post(&url)
            .headers(outbound_headers(request_id))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, method, "settings service response");

        if !status.is_success() {
            return Err(SettingsError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SettingsService for HttpSettingsClient {
    async fn get_value_by_unique_identifiers(
        &self,
        account_uuid: &str,
        setting_id: &str,
        request_id: Option<&str>,
    ) -> Result<SettingValue, SettingsError> {
        let request = GetValueByUniqueIdentifiersRequest {
            account_uuid,
            setting_id,
        };
        let response: GetValueResponse = self
            .call("values-get-by-unique-identifiers", &request, request_id)
            .await?;

        Ok(response
            .value
            .and_then(|v| v.value)
            .map(SettingValue::from)
            .unwrap_or(SettingValue::Empty))
    }

    async fn save_bundle(&self, bundle: &Bundle) -> Result<Bundle, SettingsError> {
        let response: SaveBundleResponse = self
            .call("bundle-save", &SaveBundleRequest { bundle }, None)
            .await?;
        response.bundle.ok_or(SettingsError::MissingField("bundle"))
    }

    async fn add_setting_to_bundle(
        &self,
        bundle_id: &str,
        setting: &Setting,
    ) -> Result<Setting, SettingsError> {
        let request = AddSettingToBundleRequest { bundle_id, setting };
        let response: AddSettingToBundleResponse =
            self.call("bundles-add-setting", &request, None).await?;
        response.setting.ok_or(SettingsError::MissingField("setting"))
    }
}

use crate::middleware::RequestPrincipal;
use crate::models::{GreetRequest, GreetResponse};
use crate::services::settings::SettingsService;
use metrics::{counter, histogram};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use validator::Validate;

/// Phrase used when the caller has no override.
pub const DEFAULT_PHRASE: &str = "Hello %s";

const PLACEHOLDER: &str = "%s";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GreetError {
    #[error("missing a name")]
    MissingName,
}

impl From<GreetError> for AppError {
    fn from(err: GreetError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// A greeting template with exactly one name placeholder: its last `%s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingPhrase(String);

impl GreetingPhrase {
    pub fn default_phrase() -> Self {
        Self(DEFAULT_PHRASE.to_string())
    }

    /// Build a phrase from a user-configured value. Blank values (spaces and
    /// tabs only) are no override.
    pub fn from_override(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_matches(|c| c == ' ' || c == '\t');
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(format!("{} {}", trimmed, PLACEHOLDER)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, name: &str) -> String {
        match self.0.rfind(PLACEHOLDER) {
            Some(idx) => format!(
                "{}{}{}",
                &self.0[..idx],
                name,
                &self.0[idx + PLACEHOLDER.len()..]
            ),
            None => format!("{} {}", self.0, name),
        }
    }
}

impl Default for GreetingPhrase {
    fn default() -> Self {
        Self::default_phrase()
    }
}

/// Answers greet requests with the caller's configured phrase.
#[derive(Clone)]
pub struct Greeter {
    settings: Arc<dyn SettingsService>,
    phrase_setting_id: String,
}

impl Greeter {
    pub fn new(settings: Arc<dyn SettingsService>, phrase_setting_id: impl Into<String>) -> Self {
        Self {
            settings,
            phrase_setting_id: phrase_setting_id.into(),
        }
    }

    #[tracing::instrument(
        name = "Hello.Greet",
        skip(self, principal, request),
        fields(name = %request.name, account_uuid = tracing::field::Empty)
    )]
    pub async fn greet(
        &self,
        principal: &RequestPrincipal,
        request: &GreetRequest,
    ) -> Result<GreetResponse, GreetError> {
        let start = Instant::now();

        if request.validate().is_err() {
            tracing::warn!(
                duration_ms = start.elapsed().as_millis() as u64,
                "Failed to execute: missing a name"
            );
            return Err(GreetError::MissingName);
        }

        if let Some(account) = &principal.account_uuid {
            tracing::Span::current().record("account_uuid", account.as_str());
        }

        let phrase = self.resolve_phrase(principal).await;
        let message = phrase.render(&request.name);

        let elapsed = start.elapsed();
        counter!("hello_greet_total").increment(1);
        histogram!("hello_greet_duration_seconds").record(elapsed.as_secs_f64());
        tracing::debug!(duration_ms = elapsed.as_millis() as u64, "Greet served");

        Ok(GreetResponse { message })
    }

    /// The caller's phrase override, or the default. Settings service errors
    /// never escape.
    pub async fn resolve_phrase(&self, principal: &RequestPrincipal) -> GreetingPhrase {
        let Some(account_uuid) = principal.account_uuid.as_deref() else {
            return GreetingPhrase::default_phrase();
        };

        match self
            .settings
            .get_value_by_unique_identifiers(
                account_uuid,
                &self.phrase_setting_id,
                principal.request_id.as_deref(),
            )
            .await
        {
            Ok(value) => value
                .as_string()
                .and_then(GreetingPhrase::from_override)
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, "Phrase lookup failed, using default");
                GreetingPhrase::default_phrase()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bundle, Setting, SettingValue};
    use crate::services::settings::SettingsError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers every value lookup with a fixed result and records the calls.
    struct StubSettings {
        reply: Box<dyn Fn() -> Result<SettingValue, SettingsError> + Send + Sync>,
        lookups: AtomicUsize,
        last_lookup: Mutex<Option<(String, String)>>,
    }

    impl StubSettings {
        fn new(
            reply: impl Fn() -> Result<SettingValue, SettingsError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                lookups: AtomicUsize::new(0),
                last_lookup: Mutex::new(None),
            })
        }

        fn string(value: &'static str) -> Arc<Self> {
            Self::new(move || Ok(SettingValue::String(value.to_string())))
        }

        fn failing() -> Arc<Self> {
            Self::new(|| Err(SettingsError::MissingField("value")))
        }
    }

    #[async_trait]
    impl SettingsService for StubSettings {
        async fn get_value_by_unique_identifiers(
            &self,
            account_uuid: &str,
            setting_id: &str,
            _request_id: Option<&str>,
        ) -> Result<SettingValue, SettingsError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            *self.last_lookup.lock().unwrap() =
                Some((account_uuid.to_string(), setting_id.to_string()));
            (self.reply)()
        }

        async fn save_bundle(&self, bundle: &Bundle) -> Result<Bundle, SettingsError> {
            Ok(bundle.clone())
        }

        async fn add_setting_to_bundle(
            &self,
            _bundle_id: &str,
            setting: &Setting,
        ) -> Result<Setting, SettingsError> {
            Ok(setting.clone())
        }
    }

    fn greeter(stub: &Arc<StubSettings>) -> Greeter {
        Greeter::new(stub.clone(), "phrase-setting")
    }

    #[test]
    fn override_is_trimmed_and_gets_placeholder() {
        let phrase = GreetingPhrase::from_override("  Howdy  ").unwrap();
        assert_eq!(phrase.as_str(), "Howdy %s");
    }

    #[test]
    fn tabs_and_spaces_only_is_no_override() {
        assert!(GreetingPhrase::from_override(" \t  \t").is_none());
        assert!(GreetingPhrase::from_override("").is_none());
    }

    #[test]
    fn render_substitutes_the_last_placeholder() {
        assert_eq!(GreetingPhrase::default_phrase().render("Ada"), "Hello Ada");

        let phrase = GreetingPhrase::from_override("100%s sure").unwrap();
        assert_eq!(phrase.render("Ada"), "100%s sure Ada");
    }

    #[tokio::test]
    async fn greets_with_override_phrase() {
        let stub = StubSettings::string("Hi there");
        let response = greeter(&stub)
            .greet(&RequestPrincipal::account("acc-1"), &GreetRequest::new("Ada"))
            .await
            .unwrap();

        assert_eq!(response.message, "Hi there Ada");
        assert_eq!(
            stub.last_lookup.lock().unwrap().clone(),
            Some(("acc-1".to_string(), "phrase-setting".to_string()))
        );
    }

    #[tokio::test]
    async fn empty_name_is_rejected_without_lookup() {
        let stub = StubSettings::string("Hi there");
        let err = greeter(&stub)
            .greet(&RequestPrincipal::account("acc-1"), &GreetRequest::new(""))
            .await
            .unwrap_err();

        assert_eq!(err, GreetError::MissingName);
        assert_eq!(err.to_string(), "missing a name");
        assert_eq!(stub.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn anonymous_caller_gets_default_without_lookup() {
        let stub = StubSettings::string("Hi there");
        let phrase = greeter(&stub)
            .resolve_phrase(&RequestPrincipal::anonymous())
            .await;

        assert_eq!(phrase, GreetingPhrase::default_phrase());
        assert_eq!(stub.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_is_deterministic() {
        let stubs = [
            StubSettings::failing(),
            StubSettings::string(""),
            StubSettings::string(" \t "),
            StubSettings::new(|| Ok(SettingValue::Empty)),
            StubSettings::new(|| Ok(SettingValue::Int(3))),
            StubSettings::new(|| Ok(SettingValue::Bool(true))),
            StubSettings::new(|| Ok(SettingValue::List(vec!["Hi".to_string()]))),
        ];

        for stub in stubs {
            let g = greeter(&stub);
            for _ in 0..2 {
                let phrase = g.resolve_phrase(&RequestPrincipal::account("acc")).await;
                assert_eq!(phrase.as_str(), DEFAULT_PHRASE);
            }
        }
    }

    #[tokio::test]
    async fn settings_failure_never_fails_greet() {
        let stub = StubSettings::failing();
        let response = greeter(&stub)
            .greet(&RequestPrincipal::account("acc"), &GreetRequest::new("Grace"))
            .await
            .unwrap();

        assert_eq!(response.message, "Hello Grace");
    }

    #[test]
    fn missing_name_maps_to_bad_request() {
        let err: AppError = GreetError::MissingName.into();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "Bad request: missing a name");
    }
}

//! Startup registration of this service's settings bundle and permissions.
//!
//! The bundle save is retried inline. A permission that fails its first
//! attempt is retried on its own task so one slow permission never holds up
//! the others or the caller. Failures end in an error log, never in a crash.
//!
//! Budgets: the bundle gets `max_retries` retries after the first attempt,
//! a permission gets `max_retries - 1`, i.e. `max_retries` attempts in total.

use crate::models::Bundle;
use crate::services::bundles::{
    greeting_bundle, permission_grants, BundleIdentifiers, PermissionGrant,
};
use crate::services::settings::SettingsService;
use futures::future::join_all;
use metrics::counter;
use service_core::retry::RetryConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrarConfig {
    pub identifiers: BundleIdentifiers,
    /// Permissions attached after the bundle save, in order.
    pub grants: Vec<PermissionGrant>,
    pub retry: RetryConfig,
}

impl RegistrarConfig {
    /// The stock grants for `identifiers` with the given retry policy.
    pub fn new(identifiers: BundleIdentifiers, retry: RetryConfig) -> Self {
        Self {
            grants: permission_grants(&identifiers),
            identifiers,
            retry,
        }
    }
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self::new(
            BundleIdentifiers::default(),
            RetryConfig::immediate(DEFAULT_MAX_RETRIES),
        )
    }
}

/// Terminal state of one registration call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Accepted after `attempts` calls.
    Registered { attempts: u32 },
    /// Budget exhausted after `attempts` calls.
    Failed { attempts: u32 },
    /// Shutdown requested after `attempts` calls.
    Cancelled { attempts: u32 },
}

impl RegistrationOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RegistrationOutcome::Registered { attempts }
            | RegistrationOutcome::Failed { attempts }
            | RegistrationOutcome::Cancelled { attempts } => *attempts,
        }
    }

    /// Calls made after the first one.
    pub fn retries(&self) -> u32 {
        self.attempts().saturating_sub(1)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            RegistrationOutcome::Registered { .. } => "registered",
            RegistrationOutcome::Failed { .. } => "failed",
            RegistrationOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

/// A permission attachment, either settled on the first call or still
/// retrying in the background.
#[derive(Debug)]
pub enum PermissionAttachment {
    Settled(RegistrationOutcome),
    Retrying(JoinHandle<RegistrationOutcome>),
}

#[derive(Debug)]
pub struct PendingPermission {
    pub setting_name: String,
    pub attachment: PermissionAttachment,
}

#[derive(Debug)]
pub struct RegistrationReport {
    pub bundle: RegistrationOutcome,
    pub permissions: Vec<PendingPermission>,
}

impl RegistrationReport {
    /// Wait for background permission retries to finish, in list order.
    pub async fn wait_for_permissions(self) -> Vec<RegistrationOutcome> {
        let pending = self.permissions.into_iter().map(|p| async move {
            match p.attachment {
                PermissionAttachment::Settled(outcome) => outcome,
                PermissionAttachment::Retrying(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(
                            setting = %p.setting_name,
                            error = %e,
                            "Permission retry task aborted"
                        );
                        RegistrationOutcome::Cancelled { attempts: 0 }
                    }
                },
            }
        });
        join_all(pending).await
    }
}

/// Pushes the greeting bundle and its permissions to the settings service.
#[derive(Clone)]
pub struct BundleRegistrar {
    settings: Arc<dyn SettingsService>,
    config: RegistrarConfig,
    shutdown: CancellationToken,
}

impl BundleRegistrar {
    pub fn new(settings: Arc<dyn SettingsService>, config: RegistrarConfig) -> Self {
        Self {
            settings,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop issuing attempts once `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// Save the bundle, then attach every permission.
    ///
    /// Returns once the bundle has settled and every permission had its first
    /// attempt; permission retries keep running on their own tasks.
    pub async fn register_settings_bundles(&self) -> RegistrationReport {
        let bundle = greeting_bundle(&self.config.identifiers);
        let bundle_outcome = self.save_bundle(&bundle).await;
        counter!(
            "hello_settings_registration_total",
            "kind" => "bundle",
            "outcome" => bundle_outcome.label()
        )
        .increment(1);

        let mut permissions = Vec::with_capacity(self.config.grants.len());
        for grant in &self.config.grants {
            permissions.push(self.attach_permission(grant.clone()).await);
        }

        RegistrationReport {
            bundle: bundle_outcome,
            permissions,
        }
    }

    async fn save_bundle(&self, bundle: &Bundle) -> RegistrationOutcome {
        match self.settings.save_bundle(bundle).await {
            Ok(saved) => {
                tracing::info!(
                    bundle_name = %saved.name,
                    bundle_id = %saved.id,
                    "Successfully registered settings bundle"
                );
                return RegistrationOutcome::Registered { attempts: 1 };
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bundle_id = %bundle.id,
                    "Error registering settings bundle at first try. retrying"
                );
            }
        }

        let max_retries = self.config.retry.max_retries;
        for attempt in 1..=max_retries {
            if !self.pause(attempt).await {
                tracing::info!(bundle_id = %bundle.id, "Bundle registration cancelled");
                return RegistrationOutcome::Cancelled { attempts: attempt };
            }

            match self.settings.save_bundle(bundle).await {
                Ok(saved) => {
                    tracing::info!(
                        bundle_name = %saved.name,
                        bundle_id = %saved.id,
                        retries = attempt,
                        "Successfully registered settings bundle after {} retries",
                        attempt
                    );
                    return RegistrationOutcome::Registered {
                        attempts: attempt + 1,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries,
                        "Error registering settings bundle. Retry {}/{}",
                        attempt,
                        max_retries
                    );
                }
            }
        }

        tracing::error!(
            bundle_name = %bundle.name,
            bundle_id = %bundle.id,
            "Failed to register settings bundle after {} retries",
            max_retries
        );
        RegistrationOutcome::Failed {
            attempts: max_retries + 1,
        }
    }

    async fn attach_permission(&self, grant: PermissionGrant) -> PendingPermission {
        let setting_name = grant.setting.name.clone();

        let attachment = match self
            .settings
            .add_setting_to_bundle(&grant.bundle_id, &grant.setting)
            .await
        {
            Ok(_) => {
                tracing::info!(
                    permission = %grant.setting.display_name,
                    bundle_id = %grant.bundle_id,
                    "Successfully added permission to bundle"
                );
                let outcome = RegistrationOutcome::Registered { attempts: 1 };
                record_permission(outcome);
                PermissionAttachment::Settled(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    setting = %setting_name,
                    bundle_id = %grant.bundle_id,
                    "Error adding permission to bundle at first try. retrying in background"
                );
                let registrar = self.clone();
                PermissionAttachment::Retrying(tokio::spawn(async move {
                    let outcome = registrar.retry_permission(&grant).await;
                    record_permission(outcome);
                    outcome
                }))
            }
        };

        PendingPermission {
            setting_name,
            attachment,
        }
    }

    async fn retry_permission(&self, grant: &PermissionGrant) -> RegistrationOutcome {
        let max_retries = self.config.retry.max_retries;

        for attempt in 1..max_retries {
            if !self.pause(attempt).await {
                tracing::info!(setting = %grant.setting.name, "Permission registration cancelled");
                return RegistrationOutcome::Cancelled { attempts: attempt };
            }

            match self
                .settings
                .add_setting_to_bundle(&grant.bundle_id, &grant.setting)
                .await
            {
                Ok(_) => {
                    tracing::info!(
                        permission = %grant.setting.display_name,
                        retries = attempt,
                        "Successfully added permission to bundle after {} retries",
                        attempt
                    );
                    return RegistrationOutcome::Registered {
                        attempts: attempt + 1,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries,
                        "Error adding permission to bundle. Retry {}/{}",
                        attempt,
                        max_retries
                    );
                }
            }
        }

        tracing::error!(
            setting = %grant.setting.name,
            bundle_id = %grant.bundle_id,
            "Failed to add permission to bundle after all retries"
        );
        RegistrationOutcome::Failed {
            attempts: max_retries.max(1),
        }
    }

    /// Wait out the backoff before retry `attempt`. `false` means shutdown was
    /// requested and no further attempt should be made.
    async fn pause(&self, attempt: u32) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = self.config.retry.pause(attempt) => true,
        }
    }
}

fn record_permission(outcome: RegistrationOutcome) {
    counter!(
        "hello_settings_registration_total",
        "kind" => "permission",
        "outcome" => outcome.label()
    )
    .increment(1);
}

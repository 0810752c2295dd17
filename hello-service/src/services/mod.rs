pub mod bundles;
pub mod greeter;
pub mod metrics;
pub mod registrar;
pub mod settings;

pub use bundles::{BundleIdentifiers, PermissionGrant};
pub use greeter::{GreetError, Greeter, GreetingPhrase, DEFAULT_PHRASE};
pub use self::metrics::{get_metrics, init_metrics};
pub use registrar::{
    BundleRegistrar, PermissionAttachment, RegistrarConfig, RegistrationOutcome,
    RegistrationReport,
};
pub use settings::{HttpSettingsClient, SettingsError, SettingsService};

//! Settings bundle and permission definitions owned by this service.
//!
//! The identifiers are a stable contract with the settings service: a
//! deployment that already holds values for them must keep seeing the same
//! UUIDs across restarts. Only the admin role bundle id is defined by the
//! settings service itself; the others belong to this service.

use crate::models::{
    Bundle, BundleType, Constraint, Operation, Permission, Resource, Setting, SettingKind,
    StringConstraint,
};

pub const EXTENSION_NAME: &str = "ocis-hello";

pub const BUNDLE_ID_GREETING: &str = "21fb587b-8b8d-4a7d-a2b3-3e5d0b2b9b7a";
pub const SETTING_ID_GREETER_PHRASE: &str = "b3584ea8-caec-4951-a2c1-92cbc70071b7";
pub const SETTING_ID_PHRASE_PERMISSION: &str = "8fb4b7ba-1f6b-4c9a-9a4e-6f5a26d9c1f2";
/// Admin role bundle, created and owned by the settings service.
pub const BUNDLE_ID_ROLE_ADMIN: &str = "71881883-1768-46bd-a24d-a356a2afdf7f";

pub const PHRASE_DEFAULT: &str = "Hello";
pub const PHRASE_MAX_LENGTH: i32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleIdentifiers {
    pub greeting_bundle_id: String,
    pub phrase_setting_id: String,
    pub phrase_permission_id: String,
    pub admin_role_bundle_id: String,
}

impl Default for BundleIdentifiers {
    fn default() -> Self {
        Self {
            greeting_bundle_id: BUNDLE_ID_GREETING.to_string(),
            phrase_setting_id: SETTING_ID_GREETER_PHRASE.to_string(),
            phrase_permission_id: SETTING_ID_PHRASE_PERMISSION.to_string(),
            admin_role_bundle_id: BUNDLE_ID_ROLE_ADMIN.to_string(),
        }
    }
}

/// A permission setting to add to a bundle this service does not own.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionGrant {
    pub bundle_id: String,
    pub setting: Setting,
}

pub fn greeting_bundle(ids: &BundleIdentifiers) -> Bundle {
    Bundle {
        id: ids.greeting_bundle_id.clone(),
        name: "greeting".to_string(),
        display_name: "Greeting".to_string(),
        extension: EXTENSION_NAME.to_string(),
        bundle_type: BundleType::Default,
        resource: Resource::system(),
        settings: vec![Setting {
            id: ids.phrase_setting_id.clone(),
            name: "phrase".to_string(),
            display_name: "Phrase".to_string(),
            description: "Phrase for replies on the greet request".to_string(),
            resource: Resource::system(),
            value: SettingKind::StringValue(StringConstraint {
                required: true,
                default: PHRASE_DEFAULT.to_string(),
                max_length: PHRASE_MAX_LENGTH,
            }),
        }],
    }
}

/// Lets admins read and write their own greeting phrase.
pub fn permission_grants(ids: &BundleIdentifiers) -> Vec<PermissionGrant> {
    vec![PermissionGrant {
        bundle_id: ids.admin_role_bundle_id.clone(),
        setting: Setting {
            id: ids.phrase_permission_id.clone(),
            name: "phrase-admin-read-write".to_string(),
            display_name: "Read and write the greeting phrase".to_string(),
            description: String::new(),
            resource: Resource::setting(ids.phrase_setting_id.clone()),
            value: SettingKind::PermissionValue(Permission {
                operation: Operation::ReadWrite,
                constraint: Constraint::Own,
            }),
        },
    }]
}

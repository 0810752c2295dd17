//! Settings service data model.
//!
//! Field and enum names follow the protobuf JSON mapping served by the
//! settings service HTTP gateway: camelCase keys, `TYPE_*` / `OPERATION_*` /
//! `CONSTRAINT_*` enum literals, and oneof variants as sibling keys.

use serde::{Deserialize, Serialize};

/// A named collection of settings owned by one extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub extension: String,
    #[serde(rename = "type", default)]
    pub bundle_type: BundleType,
    #[serde(default)]
    pub resource: Resource,
    #[serde(default)]
    pub settings: Vec<Setting>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleType {
    #[default]
    #[serde(rename = "TYPE_UNKNOWN")]
    Unknown,
    #[serde(rename = "TYPE_DEFAULT")]
    Default,
    #[serde(rename = "TYPE_ROLE")]
    Role,
}

/// What a bundle or setting applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default)]
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Resource {
    pub fn system() -> Self {
        Self {
            resource_type: ResourceType::System,
            id: None,
        }
    }

    /// Targets a single setting, as permissions do.
    pub fn setting(setting_id: impl Into<String>) -> Self {
        Self {
            resource_type: ResourceType::Setting,
            id: Some(setting_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    #[default]
    #[serde(rename = "TYPE_UNKNOWN")]
    Unknown,
    #[serde(rename = "TYPE_SYSTEM")]
    System,
    #[serde(rename = "TYPE_FILE")]
    File,
    #[serde(rename = "TYPE_SHARE")]
    Share,
    #[serde(rename = "TYPE_SETTING")]
    Setting,
    #[serde(rename = "TYPE_BUNDLE")]
    Bundle,
    #[serde(rename = "TYPE_USER")]
    User,
    #[serde(rename = "TYPE_GROUP")]
    Group,
}

/// One configurable value definition within a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource: Resource,
    #[serde(flatten)]
    pub value: SettingKind,
}

/// The typed definition carried by a setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingKind {
    #[serde(rename = "stringValue")]
    StringValue(StringConstraint),
    #[serde(rename = "permissionValue")]
    PermissionValue(Permission),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StringConstraint {
    pub required: bool,
    pub default: String,
    pub max_length: i32,
}

/// Access-control rule granting `operation` on a setting, scoped by `constraint`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permission {
    pub operation: Operation,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    #[serde(rename = "OPERATION_UNKNOWN")]
    Unknown,
    #[serde(rename = "OPERATION_CREATE")]
    Create,
    #[serde(rename = "OPERATION_READ")]
    Read,
    #[serde(rename = "OPERATION_UPDATE")]
    Update,
    #[serde(rename = "OPERATION_DELETE")]
    Delete,
    #[serde(rename = "OPERATION_WRITE")]
    Write,
    #[serde(rename = "OPERATION_READWRITE")]
    ReadWrite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    #[default]
    #[serde(rename = "CONSTRAINT_UNKNOWN")]
    Unknown,
    #[serde(rename = "CONSTRAINT_OWN")]
    Own,
    #[serde(rename = "CONSTRAINT_SHARED")]
    Shared,
    #[serde(rename = "CONSTRAINT_ALL")]
    All,
}

/// A setting's current value for one account.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Empty,
}

impl SettingValue {
    /// The string variant's text, `None` for every other variant.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            SettingValue::Int(_)
            | SettingValue::Bool(_)
            | SettingValue::List(_)
            | SettingValue::Empty => None,
        }
    }
}

/// Wire shape of a value: the oneof arrives as one of several optional keys.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueDto {
    string_value: Option<String>,
    int_value: Option<serde_json::Value>,
    bool_value: Option<bool>,
    list_value: Option<ListValueDto>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListValueDto {
    #[serde(default)]
    values: Vec<ValueDto>,
}

impl From<ValueDto> for SettingValue {
    fn from(dto: ValueDto) -> Self {
        if let Some(s) = dto.string_value {
            return SettingValue::String(s);
        }
        // int64 is rendered as a JSON string by the protobuf mapping
        if let Some(i) = dto.int_value.as_ref().and_then(parse_int) {
            return SettingValue::Int(i);
        }
        if let Some(b) = dto.bool_value {
            return SettingValue::Bool(b);
        }
        if let Some(list) = dto.list_value {
            return SettingValue::List(
                list.values
                    .into_iter()
                    .filter_map(|v| v.string_value)
                    .collect(),
            );
        }
        SettingValue::Empty
    }
}

fn parse_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

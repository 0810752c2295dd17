pub mod greet;
pub mod settings;

pub use greet::{GreetRequest, GreetResponse};
pub use settings::{
    Bundle, BundleType, Constraint, Operation, Permission, Resource, ResourceType, Setting,
    SettingKind, SettingValue, StringConstraint,
};

//! Endpoint configuration: notification targets and the content they track.

mod kind;
mod store;
mod types;

pub use kind::{EndpointKind, FormField, FormFieldType};
pub use store::{default_enabled_kinds, EndpointStore, InMemoryEndpointStore};
pub use types::{BuildTrigger, BuildTypeRule, EndpointConfig, EndpointError, PluginSettings};

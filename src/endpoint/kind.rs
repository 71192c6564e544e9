//! Endpoint kinds (serialization strategies).
//!
//! Each kind knows which settings it exposes to the admin form and how it
//! scopes listings to a single endpoint. New kinds are added as variants.

use serde::Serialize;

use super::types::PluginSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// JSON:API documents with relationship pointers
    JsonApi,
}

/// Input type of a settings form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldType {
    TextField,
}

/// A settings field rendered by the external admin form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub key: &'static str,
    pub field_type: FormFieldType,
    pub title: &'static str,
    pub description: &'static str,
    pub weight: i32,
}

impl EndpointKind {
    pub const ALL: &'static [EndpointKind] = &[EndpointKind::JsonApi];

    /// Plugin id as stored in endpoint configuration
    pub fn id(&self) -> &'static str {
        match self {
            EndpointKind::JsonApi => "jsonapi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EndpointKind::JsonApi => "JSON:API",
        }
    }

    pub fn from_plugin_id(plugin_id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.id() == plugin_id)
    }

    /// Fields this kind contributes to the endpoint settings form
    pub fn settings_form(&self) -> Vec<FormField> {
        match self {
            EndpointKind::JsonApi => vec![FormField {
                key: "secret_key",
                field_type: FormFieldType::TextField,
                title: "Secret Key",
                description: "A secret value sent to preview and build servers \
                              as an additional layer of security.",
                weight: 10,
            }],
        }
    }

    /// Normalize submitted settings (trimmed secret, blank secret removed)
    pub fn normalize_settings(&self, mut settings: PluginSettings) -> PluginSettings {
        match self {
            EndpointKind::JsonApi => {
                settings.secret_key = settings
                    .secret_key
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                settings
            }
        }
    }

    /// Query constraint scoping a listing to entities referencing `endpoint_id`
    pub fn filter_clause(&self, field_name: &str, internal_id_key: &str, endpoint_id: &str) -> String {
        match self {
            EndpointKind::JsonApi => {
                format!("filter[{}.meta.{}]={}", field_name, internal_id_key, endpoint_id)
            }
        }
    }

    /// Listing path for a type/bundle pair, without query string
    pub fn resource_path(&self, entity_type: &str, bundle: &str) -> String {
        match self {
            EndpointKind::JsonApi => format!("{}/{}", entity_type, bundle),
        }
    }
}

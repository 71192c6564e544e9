//! Content entities as reported by the content-change notification.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutation applied to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A changed content entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub bundle: String,
    pub uuid: String,
    /// Publish state; `None` for kinds that cannot be published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    /// Endpoint reference field values: field name to referenced endpoint ids
    #[serde(default)]
    pub endpoint_refs: BTreeMap<String, Vec<String>>,
    /// State before the update, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Box<ContentEntity>>,
    /// Serialized document (`{"data": {...}}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    /// Serialized related resources available for bundling
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Value>,
}

impl ContentEntity {
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        uuid: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            uuid: uuid.into(),
            published: None,
            endpoint_refs: BTreeMap::new(),
            original: None,
            document: None,
            included: Vec::new(),
        }
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn endpoint_ref<I, S>(mut self, field: impl Into<String>, endpoint_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoint_refs
            .insert(field.into(), endpoint_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn original(mut self, original: ContentEntity) -> Self {
        self.original = Some(Box::new(original));
        self
    }

    pub fn document(mut self, document: Value) -> Self {
        self.document = Some(document);
        self
    }

    pub fn include(mut self, resource: Value) -> Self {
        self.included.push(resource);
        self
    }

    /// Publishable and currently unpublished
    pub fn is_unpublished(&self) -> bool {
        self.published == Some(false)
    }

    /// Whether `field` currently lists `endpoint_id`
    pub fn references_endpoint(&self, field: &str, endpoint_id: &str) -> bool {
        self.endpoint_refs
            .get(field)
            .map(|ids| ids.iter().any(|id| id == endpoint_id))
            .unwrap_or(false)
    }

    /// First endpoint id listed in `field`
    pub fn first_endpoint_ref(&self, field: &str) -> Option<&str> {
        self.endpoint_refs
            .get(field)
            .and_then(|ids| ids.iter().find(|id| !id.is_empty()))
            .map(String::as_str)
    }
}

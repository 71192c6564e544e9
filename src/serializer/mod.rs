//! Entity serialization and related-entity bundling.

mod bundle;

use serde_json::Value;

use crate::entity::ContentEntity;

pub use bundle::{bundle_relationships, relationship_identifiers};

/// Pointer to a serialized resource (`{"type": "node--article", "id": "..."}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Read `type` and `id` from a resource or resource identifier object
    pub fn from_value(value: &Value) -> Option<Self> {
        let resource_type = value.get("type")?.as_str()?;
        let id = value.get("id")?.as_str()?;
        Some(Self::new(resource_type, id))
    }

    /// Content kind part of the resource type (`file` for `file--file`)
    pub fn kind(&self) -> &str {
        self.resource_type
            .split("--")
            .next()
            .unwrap_or(&self.resource_type)
    }
}

/// Produces documents in the relationship-document shape: a primary `data`
/// object carrying a `relationships` map of resource identifiers.
pub trait EntitySerializer: Send + Sync {
    /// Document for the entity itself; `None` when the entity cannot be serialized
    fn serialize(&self, entity: &ContentEntity) -> Option<Value>;

    /// Resource object for an entity related to `entity`
    fn serialize_related(&self, entity: &ContentEntity, identifier: &ResourceIdentifier) -> Option<Value>;
}

/// Serializer reading the documents shipped with the change notification
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedDocumentSerializer;

impl EntitySerializer for EmbeddedDocumentSerializer {
    fn serialize(&self, entity: &ContentEntity) -> Option<Value> {
        entity
            .document
            .as_ref()
            .filter(|document| document.is_object())
            .cloned()
    }

    fn serialize_related(&self, entity: &ContentEntity, identifier: &ResourceIdentifier) -> Option<Value> {
        entity
            .included
            .iter()
            .find(|resource| {
                ResourceIdentifier::from_value(resource).as_ref() == Some(identifier)
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_kind() {
        let id = ResourceIdentifier::new("file--file", "f1");
        assert_eq!(id.kind(), "file");

        let id = ResourceIdentifier::new("node", "n1");
        assert_eq!(id.kind(), "node");
    }

    #[test]
    fn test_embedded_serializer() {
        let entity = ContentEntity::new("node", "page", "n1")
            .document(json!({"data": {"type": "node--page", "id": "n1"}}))
            .include(json!({"type": "file--file", "id": "f1", "attributes": {}}));

        let serializer = EmbeddedDocumentSerializer;
        assert!(serializer.serialize(&entity).is_some());
        assert!(serializer
            .serialize_related(&entity, &ResourceIdentifier::new("file--file", "f1"))
            .is_some());
        assert!(serializer
            .serialize_related(&entity, &ResourceIdentifier::new("file--file", "f2"))
            .is_none());
    }

    #[test]
    fn test_non_object_document_is_unsupported() {
        let entity = ContentEntity::new("node", "page", "n1").document(json!("not a document"));
        assert!(EmbeddedDocumentSerializer.serialize(&entity).is_none());

        let entity = ContentEntity::new("node", "page", "n1");
        assert!(EmbeddedDocumentSerializer.serialize(&entity).is_none());
    }
}

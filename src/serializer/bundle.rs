//! Materializes related entities into an ordered batch

use std::collections::{BTreeSet, HashSet};

use serde_json::Value;

use crate::entity::ContentEntity;

use super::{EntitySerializer, ResourceIdentifier};

/// Resource identifiers referenced from a `relationships` map
pub fn relationship_identifiers(relationships: &Value) -> Vec<ResourceIdentifier> {
    let Some(map) = relationships.as_object() else {
        return Vec::new();
    };

    let mut identifiers = Vec::new();
    for relationship in map.values() {
        match relationship.get("data") {
            Some(Value::Array(items)) => {
                identifiers.extend(items.iter().filter_map(ResourceIdentifier::from_value));
            }
            Some(item @ Value::Object(_)) => {
                identifiers.extend(ResourceIdentifier::from_value(item));
            }
            _ => {}
        }
    }
    identifiers
}

/// Serialize every related entity whose kind is in `include_kinds`,
/// following their relationships in turn.
///
/// Each entity appears once, after everything it references, so the batch can
/// be applied in order. The primary entity itself is never part of the result.
pub fn bundle_relationships(
    serializer: &dyn EntitySerializer,
    entity: &ContentEntity,
    relationships: &Value,
    include_kinds: &BTreeSet<String>,
    max_depth: usize,
) -> Vec<Value> {
    let mut seen = HashSet::new();
    seen.insert(entity.uuid.clone());

    let mut bundled = Vec::new();
    collect(
        serializer,
        entity,
        relationships,
        include_kinds,
        1,
        max_depth,
        &mut seen,
        &mut bundled,
    );
    bundled
}

#[allow(clippy::too_many_arguments)]
fn collect(
    serializer: &dyn EntitySerializer,
    entity: &ContentEntity,
    relationships: &Value,
    include_kinds: &BTreeSet<String>,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<String>,
    bundled: &mut Vec<Value>,
) {
    for identifier in relationship_identifiers(relationships) {
        if !include_kinds.contains(identifier.kind()) {
            continue;
        }

        if !seen.insert(identifier.id.clone()) {
            continue;
        }

        let Some(resource) = serializer.serialize_related(entity, &identifier) else {
            tracing::debug!(
                resource_type = %identifier.resource_type,
                id = %identifier.id,
                "Related entity not available for bundling"
            );
            continue;
        };

        if depth < max_depth {
            if let Some(nested) = resource.get("relationships") {
                collect(
                    serializer,
                    entity,
                    nested,
                    include_kinds,
                    depth + 1,
                    max_depth,
                    seen,
                    bundled,
                );
            }
        }

        bundled.push(resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::EmbeddedDocumentSerializer;
    use serde_json::json;

    fn kinds(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn article() -> ContentEntity {
        ContentEntity::new("node", "article", "n1")
            .include(json!({
                "type": "user--user",
                "id": "u1",
                "relationships": {
                    "user_picture": {"data": {"type": "file--file", "id": "f2"}}
                }
            }))
            .include(json!({"type": "file--file", "id": "f1"}))
            .include(json!({"type": "file--file", "id": "f2"}))
            .include(json!({"type": "taxonomy_term--tags", "id": "t1"}))
    }

    fn relationships() -> serde_json::Value {
        json!({
            "field_author": {"data": {"type": "user--user", "id": "u1"}},
            "field_image": {"data": {"type": "file--file", "id": "f1"}},
            "field_tags": {"data": [
                {"type": "taxonomy_term--tags", "id": "t1"},
                {"type": "taxonomy_term--tags", "id": "t1"}
            ]},
            "field_self": {"data": {"type": "node--article", "id": "n1"}},
            "field_empty": {"data": null}
        })
    }

    #[test]
    fn test_dependencies_before_dependents() {
        let bundled = bundle_relationships(
            &EmbeddedDocumentSerializer,
            &article(),
            &relationships(),
            &kinds(&["user", "file"]),
            8,
        );

        let ids: Vec<&str> = bundled.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["f2", "u1", "f1"]);
    }

    #[test]
    fn test_deduplicates_and_skips_primary() {
        let bundled = bundle_relationships(
            &EmbeddedDocumentSerializer,
            &article(),
            &relationships(),
            &kinds(&["taxonomy_term", "node"]),
            8,
        );

        let ids: Vec<&str> = bundled.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["t1"]);
    }

    #[test]
    fn test_depth_limit_stops_nesting() {
        let bundled = bundle_relationships(
            &EmbeddedDocumentSerializer,
            &article(),
            &json!({"field_author": {"data": {"type": "user--user", "id": "u1"}}}),
            &kinds(&["user", "file"]),
            1,
        );

        let ids: Vec<&str> = bundled.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["u1"]);
    }

    #[test]
    fn test_identifiers_from_non_object() {
        assert!(relationship_identifiers(&json!(null)).is_empty());
    }
}

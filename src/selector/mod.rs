//! Decides which endpoints act on an entity mutation, and how.

use std::sync::Arc;

use crate::endpoint::{EndpointConfig, EndpointStore};
use crate::entity::{ContentEntity, Operation};
use crate::schema::SchemaProvider;

/// Per-endpoint selection of entity mutations
pub struct EndpointSelector {
    schema: Arc<dyn SchemaProvider>,
}

impl EndpointSelector {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self { schema }
    }

    /// Operation `endpoint` must apply for this mutation, if any.
    ///
    /// Bundles without an endpoint reference field are tracked by every
    /// matching endpoint. Otherwise the entity must reference the endpoint;
    /// an update that removes the reference becomes a delete.
    pub fn select_operation(
        &self,
        endpoint: &EndpointConfig,
        entity: &ContentEntity,
        incoming: Operation,
    ) -> Option<Operation> {
        if !endpoint.matches(&entity.entity_type, &entity.bundle) {
            return None;
        }

        let Some(field) = self
            .schema
            .endpoint_reference_field(&entity.entity_type, &entity.bundle)
        else {
            return Some(incoming);
        };

        if entity.references_endpoint(&field, &endpoint.id) {
            return Some(incoming);
        }

        if incoming == Operation::Update {
            let unlinked = entity
                .original
                .as_deref()
                .map(|original| original.references_endpoint(&field, &endpoint.id))
                .unwrap_or(false);

            if unlinked {
                tracing::debug!(
                    endpoint_id = %endpoint.id,
                    uuid = %entity.uuid,
                    "Entity unlinked from endpoint, converting update to delete"
                );
                return Some(Operation::Delete);
            }
        }

        None
    }

    /// Preview URL to open for an entity.
    ///
    /// With an endpoint reference field, the first referenced endpoint's first
    /// preview URL; otherwise the first preview URL of the first endpoint (by
    /// weight) tracking the type/bundle.
    pub fn preview_url_for_entity(
        &self,
        store: &dyn EndpointStore,
        entity: &ContentEntity,
    ) -> Option<String> {
        match self
            .schema
            .endpoint_reference_field(&entity.entity_type, &entity.bundle)
        {
            Some(field) => {
                let endpoint_id = entity.first_endpoint_ref(&field)?;
                store
                    .get(endpoint_id)
                    .and_then(|endpoint| endpoint.first_preview_url().map(str::to_string))
            }
            None => store
                .list_all()
                .into_iter()
                .find(|endpoint| endpoint.matches(&entity.entity_type, &entity.bundle))
                .and_then(|endpoint| endpoint.first_preview_url().map(str::to_string)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{BuildTypeRule, InMemoryEndpointStore};
    use crate::schema::{FieldReferenceDescriptor as Field, InMemorySchema};

    fn schema() -> Arc<dyn SchemaProvider> {
        Arc::new(
            InMemorySchema::new()
                .with_bundle("node", "page", vec![Field::plain("body")])
                .with_bundle(
                    "node",
                    "article",
                    vec![Field::endpoint_reference("field_endpoints")],
                ),
        )
    }

    fn endpoint(id: &str) -> EndpointConfig {
        EndpointConfig::new(id)
            .rule(BuildTypeRule::new("node").bundle("page").bundle("article"))
            .preview_url(format!("http://{}.preview", id))
    }

    const ALL_OPS: [Operation; 3] = [Operation::Create, Operation::Update, Operation::Delete];

    #[test]
    fn test_unmatched_bundle_is_ignored() {
        let selector = EndpointSelector::new(schema());
        let entity = ContentEntity::new("node", "landing", "u1");
        for op in ALL_OPS {
            assert_eq!(selector.select_operation(&endpoint("a"), &entity, op), None);
        }
    }

    #[test]
    fn test_bundle_without_reference_field_passes_through() {
        let selector = EndpointSelector::new(schema());
        let entity = ContentEntity::new("node", "page", "u1");
        for op in ALL_OPS {
            assert_eq!(selector.select_operation(&endpoint("a"), &entity, op), Some(op));
        }
    }

    #[test]
    fn test_referenced_endpoint_passes_through() {
        let selector = EndpointSelector::new(schema());
        let entity = ContentEntity::new("node", "article", "u1").endpoint_ref("field_endpoints", ["a"]);

        assert_eq!(
            selector.select_operation(&endpoint("a"), &entity, Operation::Create),
            Some(Operation::Create)
        );
        assert_eq!(
            selector.select_operation(&endpoint("b"), &entity, Operation::Create),
            None
        );
    }

    #[test]
    fn test_unlink_on_update_becomes_delete() {
        let selector = EndpointSelector::new(schema());
        let original = ContentEntity::new("node", "article", "u1").endpoint_ref("field_endpoints", ["a", "b"]);
        let entity = ContentEntity::new("node", "article", "u1")
            .endpoint_ref("field_endpoints", ["b"])
            .original(original);

        assert_eq!(
            selector.select_operation(&endpoint("a"), &entity, Operation::Update),
            Some(Operation::Delete)
        );
        assert_eq!(
            selector.select_operation(&endpoint("b"), &entity, Operation::Update),
            Some(Operation::Update)
        );
        assert_eq!(
            selector.select_operation(&endpoint("c"), &entity, Operation::Update),
            None
        );
    }

    #[test]
    fn test_unlink_only_applies_to_updates() {
        let selector = EndpointSelector::new(schema());
        let original = ContentEntity::new("node", "article", "u1").endpoint_ref("field_endpoints", ["a"]);
        let entity = ContentEntity::new("node", "article", "u1").original(original);

        assert_eq!(
            selector.select_operation(&endpoint("a"), &entity, Operation::Create),
            None
        );
    }

    #[test]
    fn test_update_without_original_is_ignored() {
        let selector = EndpointSelector::new(schema());
        let entity = ContentEntity::new("node", "article", "u1");
        assert_eq!(
            selector.select_operation(&endpoint("a"), &entity, Operation::Update),
            None
        );
    }

    #[test]
    fn test_preview_url_for_entity() {
        let selector = EndpointSelector::new(schema());
        let store = InMemoryEndpointStore::new();
        store.insert(endpoint("first").weight(1));
        store.insert(endpoint("second").weight(0));

        let page = ContentEntity::new("node", "page", "u1");
        assert_eq!(
            selector.preview_url_for_entity(&store, &page).as_deref(),
            Some("http://second.preview")
        );

        let article = ContentEntity::new("node", "article", "u2").endpoint_ref("field_endpoints", ["first"]);
        assert_eq!(
            selector.preview_url_for_entity(&store, &article).as_deref(),
            Some("http://first.preview")
        );

        let orphan = ContentEntity::new("node", "article", "u3").endpoint_ref("field_endpoints", ["gone"]);
        assert_eq!(selector.preview_url_for_entity(&store, &orphan), None);
    }
}

//! Schema provider abstraction and the snapshot-backed implementation

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use super::types::{BundleSchema, ContentKindSchema, FieldKind, FieldReferenceDescriptor};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse schema snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Field definitions for content types and bundles
pub trait SchemaProvider: Send + Sync {
    /// Fields of a type/bundle pair. Unknown pairs have no fields.
    fn fields_of(&self, entity_type: &str, bundle: &str) -> Vec<FieldReferenceDescriptor>;

    /// Known content kinds with their labels
    fn content_kinds(&self) -> BTreeMap<String, String>;

    /// Bundles of a content kind with their labels
    fn bundles_of(&self, kind: &str) -> BTreeMap<String, String>;

    /// Name of the first endpoint reference field of a type/bundle
    fn endpoint_reference_field(&self, entity_type: &str, bundle: &str) -> Option<String> {
        self.fields_of(entity_type, bundle)
            .into_iter()
            .find(|field| field.kind == FieldKind::EndpointReference && !field.name.is_empty())
            .map(|field| field.name)
    }
}

/// Immutable schema snapshot
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    kinds: BTreeMap<String, ContentKindSchema>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot of the form `{ "<kind>": { "label", "bundles": { ... } } }`
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SchemaError> {
        let kinds: BTreeMap<String, ContentKindSchema> = serde_json::from_str(raw)?;
        Ok(Self { kinds })
    }

    /// Add (or replace) a bundle with its fields
    pub fn with_bundle(
        mut self,
        kind: impl Into<String>,
        bundle: impl Into<String>,
        fields: Vec<FieldReferenceDescriptor>,
    ) -> Self {
        let kind = kind.into();
        let bundle = bundle.into();
        let entry = self.kinds.entry(kind.clone()).or_insert_with(|| ContentKindSchema {
            label: kind,
            bundles: BTreeMap::new(),
        });
        entry.bundles.insert(
            bundle.clone(),
            BundleSchema {
                label: bundle,
                fields,
            },
        );
        self
    }
}

impl SchemaProvider for InMemorySchema {
    fn fields_of(&self, entity_type: &str, bundle: &str) -> Vec<FieldReferenceDescriptor> {
        self.kinds
            .get(entity_type)
            .and_then(|kind| kind.bundles.get(bundle))
            .map(|b| b.fields.clone())
            .unwrap_or_default()
    }

    fn content_kinds(&self) -> BTreeMap<String, String> {
        self.kinds
            .iter()
            .map(|(id, kind)| (id.clone(), kind.label.clone()))
            .collect()
    }

    fn bundles_of(&self, kind: &str) -> BTreeMap<String, String> {
        self.kinds
            .get(kind)
            .map(|k| {
                k.bundles
                    .iter()
                    .map(|(id, bundle)| (id.clone(), bundle.label.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

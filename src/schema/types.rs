use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Field kinds relevant to relationship resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Plain,
    FileReference,
    ImageReference,
    CommentReference,
    EntityReference,
    EntityReferenceWithRevisions,
    /// Reference to the endpoints an entity is published to
    EndpointReference,
}

impl FieldKind {
    /// Entity kind behind a core reference field (`file`, `image`, `comment`)
    pub fn core_reference_kind(&self) -> Option<&'static str> {
        match self {
            FieldKind::FileReference => Some("file"),
            FieldKind::ImageReference => Some("image"),
            FieldKind::CommentReference => Some("comment"),
            _ => None,
        }
    }

    pub fn is_entity_reference(&self) -> bool {
        matches!(
            self,
            FieldKind::EntityReference | FieldKind::EntityReferenceWithRevisions
        )
    }
}

/// Field of a content type/bundle as seen by the resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReferenceDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Target content kind mapped to the bundles it may reference
    #[serde(default)]
    pub targets: BTreeMap<String, BTreeSet<String>>,
}

impl FieldReferenceDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            targets: BTreeMap::new(),
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Plain)
    }

    pub fn endpoint_reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::EndpointReference)
    }

    /// Entity reference field targeting `kind` restricted to `bundles`
    pub fn entity_reference<I, S>(name: impl Into<String>, kind: impl Into<String>, bundles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldKind::EntityReference).target(kind, bundles)
    }

    pub fn target<I, S>(mut self, kind: impl Into<String>, bundles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets
            .entry(kind.into())
            .or_default()
            .extend(bundles.into_iter().map(Into::into));
        self
    }
}

/// Bundle definition in a schema snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSchema {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: Vec<FieldReferenceDescriptor>,
}

/// Content kind definition in a schema snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKindSchema {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub bundles: BTreeMap<String, BundleSchema>,
}

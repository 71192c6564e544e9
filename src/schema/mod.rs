//! Content schema: the field graph the resolver walks.

mod provider;
mod types;

pub use provider::{InMemorySchema, SchemaError, SchemaProvider};
pub use types::{BundleSchema, ContentKindSchema, FieldKind, FieldReferenceDescriptor};

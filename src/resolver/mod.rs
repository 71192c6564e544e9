//! Relationship path resolution.
//!
//! Walks a content type's reference fields to find the include paths needed
//! to embed related entities, plus the filter clause scoping a listing to a
//! single endpoint. Paths are deduplicated and minimized so that only the
//! longest relationship chains remain.

mod includes;
mod links;
mod paths;

pub use includes::{effective_include_kinds, RelationshipResolver, ResolvedIncludeSet, ResolverOptions};
pub use links::absolute_link;
pub use paths::{dedup_paths, minimize_paths};

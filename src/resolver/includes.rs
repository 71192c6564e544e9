//! Recursive include path resolution over the reference field graph

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::endpoint::{EndpointConfig, EndpointError};
use crate::metrics::ResolverMetrics;
use crate::schema::{FieldKind, SchemaProvider};

use super::paths::minimize_paths;

/// Resolver behavior switches
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Append `include=` to generated query strings
    pub append_include_param: bool,
    /// Deepest nesting level followed through entity references
    pub max_depth: usize,
    /// Meta key holding the referenced endpoint id in filter clauses
    pub internal_id_key: String,
    pub cache_enabled: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            append_include_param: false,
            max_depth: 8,
            internal_id_key: "drupal_internal__target_id".to_string(),
            cache_enabled: true,
        }
    }
}

/// Filter clause and minimized include paths for one type/bundle/endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedIncludeSet {
    pub filter_clause: Option<String>,
    pub include_paths: Vec<String>,
}

impl ResolvedIncludeSet {
    /// `?filter...&include=...`, or an empty string when there is nothing to add
    pub fn query_string(&self, append_include: bool) -> String {
        let mut parts = Vec::with_capacity(2);

        if let Some(filter) = self.filter_clause.as_deref().filter(|f| !f.is_empty()) {
            parts.push(filter.to_string());
        }

        if append_include && !self.include_paths.is_empty() {
            parts.push(format!("include={}", self.include_paths.join(",")));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

/// Images are files, so including files always includes images too
pub fn effective_include_kinds(kinds: &BTreeSet<String>) -> BTreeSet<String> {
    let mut effective = kinds.clone();
    if effective.contains("file") {
        effective.insert("image".to_string());
    }
    effective
}

/// Endpoint-independent outcome of walking one type/bundle
#[derive(Debug, Clone, Default)]
struct IncludeBranch {
    filter_field: Option<String>,
    paths: Vec<String>,
}

type CacheKey = (String, String, String);

/// Computes include paths and filter clauses from the schema's field graph
pub struct RelationshipResolver {
    schema: Arc<dyn SchemaProvider>,
    options: ResolverOptions,
    cache: DashMap<CacheKey, Arc<IncludeBranch>>,
}

impl RelationshipResolver {
    pub fn new(schema: Arc<dyn SchemaProvider>, options: ResolverOptions) -> Self {
        Self {
            schema,
            options,
            cache: DashMap::new(),
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn schema(&self) -> &Arc<dyn SchemaProvider> {
        &self.schema
    }

    /// Resolve the filter clause and include paths for a type/bundle as seen
    /// by `endpoint`.
    #[tracing::instrument(
        name = "resolver.resolve_includes",
        skip(self, endpoint, include_kinds),
        fields(endpoint_id = %endpoint.id)
    )]
    pub fn resolve_includes(
        &self,
        entity_type: &str,
        bundle: &str,
        endpoint: &EndpointConfig,
        include_kinds: &BTreeSet<String>,
    ) -> Result<ResolvedIncludeSet, EndpointError> {
        let kind = endpoint.kind()?;
        let branch = self.root_branch(entity_type, bundle, include_kinds);

        let filter_clause = branch
            .filter_field
            .as_deref()
            .map(|field| kind.filter_clause(field, &self.options.internal_id_key, &endpoint.id));

        Ok(ResolvedIncludeSet {
            filter_clause,
            include_paths: minimize_paths(&branch.paths),
        })
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn root_branch(
        &self,
        entity_type: &str,
        bundle: &str,
        include_kinds: &BTreeSet<String>,
    ) -> Arc<IncludeBranch> {
        let kinds = effective_include_kinds(include_kinds);

        if !self.options.cache_enabled {
            return Arc::new(self.walk(entity_type, bundle, &kinds, None, &[]));
        }

        let signature = kinds.iter().cloned().collect::<Vec<_>>().join(",");
        let key = (entity_type.to_string(), bundle.to_string(), signature);

        if let Some(hit) = self.cache.get(&key) {
            ResolverMetrics::record_cache_hit();
            return hit.value().clone();
        }

        ResolverMetrics::record_cache_miss();
        let branch = Arc::new(self.walk(entity_type, bundle, &kinds, None, &[]));
        self.cache.insert(key, branch.clone());
        branch
    }

    /// Walk one type/bundle. `ancestors` holds every type/bundle on the path
    /// from the root to this one; revisiting one of them, or going deeper than
    /// `max_depth`, fails that branch only.
    fn walk(
        &self,
        entity_type: &str,
        bundle: &str,
        kinds: &BTreeSet<String>,
        prefix: Option<&str>,
        ancestors: &[(String, String)],
    ) -> IncludeBranch {
        let mut branch = IncludeBranch::default();

        let mut lineage = ancestors.to_vec();
        lineage.push((entity_type.to_string(), bundle.to_string()));
        let depth = lineage.len();

        for field in self.schema.fields_of(entity_type, bundle) {
            if field.name.is_empty() {
                continue;
            }

            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, field.name),
                None => field.name.clone(),
            };

            if field.kind == FieldKind::EndpointReference {
                // last one wins
                branch.filter_field = Some(field.name.clone());
                continue;
            }

            if let Some(core_kind) = field.kind.core_reference_kind() {
                if kinds.contains(core_kind) {
                    branch.paths.push(path);
                }
                continue;
            }

            if !field.kind.is_entity_reference() {
                continue;
            }

            let targets: Vec<(&String, &BTreeSet<String>)> = field
                .targets
                .iter()
                .filter(|(target_kind, _)| kinds.contains(*target_kind))
                .collect();

            if targets.is_empty() {
                continue;
            }

            let mut nested = Vec::new();
            let mut attempted = 0usize;
            let mut failed = 0usize;

            for (target_kind, target_bundles) in targets {
                for target_bundle in target_bundles {
                    attempted += 1;

                    let revisits = lineage
                        .iter()
                        .any(|(t, b)| t == target_kind && b == target_bundle);
                    if revisits {
                        tracing::warn!(
                            path = %path,
                            reference = %format!("{}--{}", target_kind, target_bundle),
                            "Reference cycle detected, dropping include branch"
                        );
                        failed += 1;
                        continue;
                    }

                    if depth > self.options.max_depth {
                        tracing::warn!(
                            path = %path,
                            max_depth = self.options.max_depth,
                            "Maximum include depth exceeded, dropping include branch"
                        );
                        failed += 1;
                        continue;
                    }

                    let child = self.walk(target_kind, target_bundle, kinds, Some(&path), &lineage);
                    nested.extend(child.paths);
                }
            }

            if attempted > 0 && failed == attempted {
                continue;
            }

            branch.paths.push(path);
            branch.paths.extend(nested);
        }

        branch
    }
}

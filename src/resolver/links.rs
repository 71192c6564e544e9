//! Listing links per type/bundle pair of an endpoint

use std::collections::BTreeMap;

use crate::endpoint::{EndpointConfig, EndpointError};

use super::includes::RelationshipResolver;

impl RelationshipResolver {
    /// Relative listing path plus query string, keyed by `<type>--<bundle>`.
    ///
    /// ```text
    /// node--page => node/page?filter[field_gatsby.meta.drupal_internal__target_id]=default
    /// ```
    pub fn endpoint_links(
        &self,
        endpoint: &EndpointConfig,
    ) -> Result<BTreeMap<String, String>, EndpointError> {
        let kind = endpoint.kind()?;
        let mut links = BTreeMap::new();

        for rule in endpoint.build_rules() {
            for bundle in &rule.bundles {
                let resolved = self.resolve_includes(
                    &rule.entity_type,
                    bundle,
                    endpoint,
                    &rule.include_entity_kinds,
                )?;

                let key = format!("{}--{}", rule.entity_type, bundle);
                let link = format!(
                    "{}{}",
                    kind.resource_path(&rule.entity_type, bundle),
                    resolved.query_string(self.options().append_include_param)
                );
                links.insert(key, link);
            }
        }

        Ok(links)
    }
}

/// Join a relative link onto `<base_url>/<path_prefix>/`
pub fn absolute_link(base_url: &str, path_prefix: &str, link: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = path_prefix.trim_matches('/');

    if prefix.is_empty() {
        format!("{}/{}", base, link)
    } else {
        format!("{}/{}/{}", base, prefix, link)
    }
}

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::kind::EndpointKind;

/// When build URLs fire for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTrigger {
    /// On every matching entity mutation
    #[default]
    Incremental,
    /// Left to a periodic sweep outside this service
    Cron,
    /// Only when an operator asks for it
    Manual,
}

impl BuildTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTrigger::Incremental => "incremental",
            BuildTrigger::Cron => "cron",
            BuildTrigger::Manual => "manual",
        }
    }
}

impl fmt::Display for BuildTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content type/bundle selection for an endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTypeRule {
    pub entity_type: String,
    #[serde(default)]
    pub bundles: BTreeSet<String>,
    /// Related entity kinds bundled along with a matching entity
    #[serde(default)]
    pub include_entity_kinds: BTreeSet<String>,
    #[serde(default)]
    pub build_only_published: bool,
}

impl BuildTypeRule {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            ..Default::default()
        }
    }

    pub fn bundle(mut self, bundle: impl Into<String>) -> Self {
        self.bundles.insert(bundle.into());
        self
    }

    pub fn include(mut self, kind: impl Into<String>) -> Self {
        self.include_entity_kinds.insert(kind.into());
        self
    }

    pub fn only_published(mut self, only_published: bool) -> Self {
        self.build_only_published = only_published;
        self
    }

    /// A rule without an entity type is ignored everywhere
    pub fn is_valid(&self) -> bool {
        !self.entity_type.trim().is_empty()
    }

    pub fn matches(&self, entity_type: &str, bundle: &str) -> bool {
        self.is_valid() && self.entity_type == entity_type && self.bundles.contains(bundle)
    }
}

/// Settings owned by the endpoint kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PluginSettings {
    /// Secret key, if one is configured and non-empty
    pub fn secret(&self) -> Option<&str> {
        self.secret_key.as_deref().filter(|s| !s.is_empty())
    }
}

/// Errors raised while loading or validating endpoint configuration
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Endpoint id must not be empty")]
    MissingId,

    #[error("Duplicate endpoint id: {0}")]
    DuplicateId(String),

    #[error("Endpoint {endpoint_id} references unknown plugin '{plugin_id}'")]
    UnknownPlugin {
        endpoint_id: String,
        plugin_id: String,
    },

    #[error("Endpoint {endpoint_id} has an invalid URL '{url}': {reason}")]
    InvalidUrl {
        endpoint_id: String,
        url: String,
        reason: String,
    },

    #[error("Failed to read endpoint catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse endpoint catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_plugin_id() -> String {
    EndpointKind::JsonApi.id().to_string()
}

/// One notification target plus the rules describing which content it cares about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Listing order, ascending
    #[serde(default)]
    pub weight: i32,
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
    #[serde(default)]
    pub plugin_settings: PluginSettings,
    #[serde(default)]
    pub build_entity_types: Vec<BuildTypeRule>,
    #[serde(default)]
    pub preview_urls: Vec<String>,
    #[serde(default)]
    pub build_urls: Vec<String>,
    #[serde(default)]
    pub build_trigger: BuildTrigger,
}

impl EndpointConfig {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            weight: 0,
            plugin_id: default_plugin_id(),
            plugin_settings: PluginSettings::default(),
            build_entity_types: Vec::new(),
            preview_urls: Vec::new(),
            build_urls: Vec::new(),
            build_trigger: BuildTrigger::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn rule(mut self, rule: BuildTypeRule) -> Self {
        self.build_entity_types.push(rule);
        self
    }

    pub fn preview_url(mut self, url: impl Into<String>) -> Self {
        self.preview_urls.push(url.into());
        self
    }

    pub fn build_url(mut self, url: impl Into<String>) -> Self {
        self.build_urls.push(url.into());
        self
    }

    pub fn trigger(mut self, trigger: BuildTrigger) -> Self {
        self.build_trigger = trigger;
        self
    }

    pub fn secret_key(mut self, secret: impl Into<String>) -> Self {
        self.plugin_settings.secret_key = Some(secret.into());
        self
    }

    pub fn plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = plugin_id.into();
        self
    }

    /// The serialization strategy this endpoint is configured with
    pub fn kind(&self) -> Result<EndpointKind, EndpointError> {
        EndpointKind::from_plugin_id(&self.plugin_id).ok_or_else(|| EndpointError::UnknownPlugin {
            endpoint_id: self.id.clone(),
            plugin_id: self.plugin_id.clone(),
        })
    }

    /// Rules with a non-empty entity type
    pub fn build_rules(&self) -> impl Iterator<Item = &BuildTypeRule> {
        self.build_entity_types.iter().filter(|rule| rule.is_valid())
    }

    /// Whether any rule selects this type/bundle pair
    pub fn matches(&self, entity_type: &str, bundle: &str) -> bool {
        self.build_rules().any(|rule| rule.matches(entity_type, bundle))
    }

    /// Rule governing an entity of the given type.
    ///
    /// A rule matching both type and bundle wins; otherwise the first rule for
    /// the type is used.
    pub fn build_type_rule(&self, entity_type: &str, bundle: &str) -> Option<&BuildTypeRule> {
        self.build_rules()
            .find(|rule| rule.matches(entity_type, bundle))
            .or_else(|| self.build_rules().find(|rule| rule.entity_type == entity_type))
    }

    pub fn preview_urls(&self) -> impl Iterator<Item = &str> {
        non_empty(&self.preview_urls)
    }

    pub fn build_urls(&self) -> impl Iterator<Item = &str> {
        non_empty(&self.build_urls)
    }

    pub fn first_preview_url(&self) -> Option<&str> {
        self.preview_urls().next()
    }

    /// Drop malformed entries: rules without a type, blank URLs and URLs
    /// that are not absolute http(s)
    pub fn sanitize(mut self) -> Self {
        self.build_entity_types.retain(|rule| rule.is_valid());
        self.preview_urls = usable_urls(&self.id, &self.preview_urls);
        self.build_urls = usable_urls(&self.id, &self.build_urls);
        self
    }

    /// Check identifier and URL well-formedness
    pub fn validate(&self) -> Result<(), EndpointError> {
        if self.id.trim().is_empty() {
            return Err(EndpointError::MissingId);
        }

        for url in self.preview_urls().chain(self.build_urls()) {
            check_url(url).map_err(|reason| EndpointError::InvalidUrl {
                endpoint_id: self.id.clone(),
                url: url.to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}

fn check_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("unsupported scheme '{}'", scheme)),
    }
}

fn usable_urls(endpoint_id: &str, urls: &[String]) -> Vec<String> {
    non_empty(urls)
        .filter(|url| match check_url(url) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    url = %url,
                    reason = %reason,
                    "Dropping invalid endpoint URL"
                );
                false
            }
        })
        .map(str::to_string)
        .collect()
}

fn non_empty(urls: &[String]) -> impl Iterator<Item = &str> {
    urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_without_type_is_ignored() {
        let endpoint = EndpointConfig::new("site")
            .rule(BuildTypeRule::new("").bundle("page"))
            .rule(BuildTypeRule::new("node").bundle("article"));

        assert!(!endpoint.matches("", "page"));
        assert!(endpoint.matches("node", "article"));
        assert!(!endpoint.matches("node", "page"));
        assert_eq!(endpoint.build_rules().count(), 1);
    }

    #[test]
    fn test_build_type_rule_prefers_bundle_match() {
        let endpoint = EndpointConfig::new("site")
            .rule(BuildTypeRule::new("node").bundle("page"))
            .rule(BuildTypeRule::new("node").bundle("article").include("file"));

        let rule = endpoint.build_type_rule("node", "article").unwrap();
        assert!(rule.include_entity_kinds.contains("file"));

        let fallback = endpoint.build_type_rule("node", "landing").unwrap();
        assert!(fallback.bundles.contains("page"));

        assert!(endpoint.build_type_rule("taxonomy_term", "tags").is_none());
    }

    #[test]
    fn test_empty_urls_are_filtered() {
        let endpoint = EndpointConfig::new("site")
            .preview_url("")
            .preview_url("http://preview.local")
            .build_url("   ");

        assert_eq!(endpoint.preview_urls().collect::<Vec<_>>(), vec!["http://preview.local"]);
        assert_eq!(endpoint.build_urls().count(), 0);

        let sanitized = endpoint.sanitize();
        assert_eq!(sanitized.preview_urls, vec!["http://preview.local".to_string()]);
        assert!(sanitized.build_urls.is_empty());
    }

    #[test]
    fn test_validate_rejects_relative_url() {
        let endpoint = EndpointConfig::new("site").build_url("/relative/path");
        assert!(matches!(
            endpoint.validate(),
            Err(EndpointError::InvalidUrl { .. })
        ));

        let endpoint = EndpointConfig::new("site").build_url("ftp://builds.local");
        assert!(endpoint.validate().is_err());

        let endpoint = EndpointConfig::new(" ");
        assert!(matches!(endpoint.validate(), Err(EndpointError::MissingId)));
    }

    #[test]
    fn test_sanitize_drops_invalid_urls() {
        let endpoint = EndpointConfig::new("site")
            .preview_url("http//typo")
            .preview_url("https://preview.local")
            .build_url("ftp://builds.local")
            .build_url("http://builds.local/hook");

        let sanitized = endpoint.sanitize();
        assert_eq!(sanitized.preview_urls, vec!["https://preview.local".to_string()]);
        assert_eq!(sanitized.build_urls, vec!["http://builds.local/hook".to_string()]);
        assert!(sanitized.validate().is_ok());
    }

    #[test]
    fn test_secret_must_be_non_empty() {
        let endpoint = EndpointConfig::new("site").secret_key("");
        assert_eq!(endpoint.plugin_settings.secret(), None);

        let endpoint = EndpointConfig::new("site").secret_key("s3cret");
        assert_eq!(endpoint.plugin_settings.secret(), Some("s3cret"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let endpoint: EndpointConfig = serde_json::from_value(json!({
            "id": "blog",
            "build_entity_types": [
                {"entity_type": "node", "bundles": ["page"], "include_entity_kinds": ["file"]}
            ],
            "build_trigger": "manual",
            "plugin_settings": {"secret_key": "abc", "extra_flag": true}
        }))
        .unwrap();

        assert_eq!(endpoint.plugin_id, "jsonapi");
        assert_eq!(endpoint.build_trigger, BuildTrigger::Manual);
        assert_eq!(endpoint.plugin_settings.secret(), Some("abc"));
        assert_eq!(endpoint.plugin_settings.extra["extra_flag"], json!(true));
        assert!(endpoint.matches("node", "page"));
    }
}

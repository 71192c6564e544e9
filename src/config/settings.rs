use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::endpoint::default_enabled_kinds;
use crate::notification::DispatchOptions;
use crate::resolver::ResolverOptions;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Add `include=` to generated listing links
    #[serde(default)]
    pub append_include_param: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_internal_id_key")]
    pub internal_id_key: String,
    /// Path segment between the site root and listing links
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Log notifications instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// JSON array of endpoint configurations
    pub endpoints_file: Option<String>,
    /// JSON schema snapshot of content kinds, bundles and fields
    pub schema_file: Option<String>,
    #[serde(default = "default_enabled_kinds")]
    pub enabled_kinds: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON formatted log lines
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_depth() -> usize {
    8
}

fn default_internal_id_key() -> String {
    "drupal_internal__target_id".to_string()
}

fn default_path_prefix() -> String {
    "jsonapi".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_concurrent_sends() -> usize {
    16
}

fn default_user_agent() -> String {
    format!("endpoint-trigger-service/{}", env!("CARGO_PKG_VERSION"))
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("resolver.max_depth", 8)?
            .set_default("transport.timeout_seconds", 10)?
            .set_default("transport.max_concurrent_sends", 16)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, API__KEY, RESOLVER__APPEND_INCLUDE_PARAM, etc.
            .add_source(environment());

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Environment source; `__` separates sections so keys may contain '_'
fn environment() -> Environment {
    Environment::default()
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("catalog.enabled_kinds")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            append_include_param: false,
            max_depth: default_max_depth(),
            internal_id_key: default_internal_id_key(),
            path_prefix: default_path_prefix(),
            cache_enabled: true,
        }
    }
}

impl ResolverConfig {
    pub fn options(&self) -> ResolverOptions {
        ResolverOptions {
            append_include_param: self.append_include_param,
            max_depth: self.max_depth,
            internal_id_key: self.internal_id_key.clone(),
            cache_enabled: self.cache_enabled,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_concurrent_sends: default_max_concurrent_sends(),
            user_agent: default_user_agent(),
            dry_run: false,
        }
    }
}

impl TransportConfig {
    pub fn dispatch_options(&self, max_bundle_depth: usize) -> DispatchOptions {
        DispatchOptions {
            max_concurrent_sends: self.max_concurrent_sends,
            max_bundle_depth,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoints_file: None,
            schema_file: None,
            enabled_kinds: default_enabled_kinds(),
        }
    }
}

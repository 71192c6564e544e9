mod settings;

pub use settings::{
    ApiConfig, CatalogConfig, LoggingConfig, ResolverConfig, ServerConfig, Settings,
    TransportConfig,
};

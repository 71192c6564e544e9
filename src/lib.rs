// Shared components
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer
pub mod endpoint;
pub mod entity;
pub mod notification;
pub mod resolver;
pub mod schema;
pub mod selector;
pub mod serializer;
pub mod service;
pub mod transport;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

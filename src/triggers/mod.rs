//! HTTP triggers: content mutation ingress and manual build requests.

mod http;

pub use http::{
    entity_mutated, trigger_endpoint_build, trigger_manual_builds, EntityMutatedRequest,
    EntityMutatedResponse, ManualBuildResponse,
};

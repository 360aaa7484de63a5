use std::sync::Arc;

use {
    switchboard_mappings::MappingService,
    switchboard_platforms::InstanceDirectory,
    switchboard_routing::MessageBroker,
};

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<MessageBroker>,
    pub mappings: Arc<MappingService>,
    pub instances: Arc<InstanceDirectory>,
}

use std::sync::Arc;

use plaint_core::config::FlowConfig;
use plaint_core::traits::ComplaintStore;
use plaint_flow::ComplaintFlow;

use crate::registry::TaskRegistry;

/// Shared application state for axum handlers.
pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub flow: Arc<ComplaintFlow>,
    pub store: Arc<dyn ComplaintStore>,
    pub settings: FlowConfig,
}

use std::sync::Arc;

use plaint_core::config::{FlowConfig, ModelConfig};
use plaint_core::traits::{ComplaintStore, LlmClient, ResourceDirectory};

/// Collaborators and tuning shared by every complaint node.
#[derive(Clone)]
pub struct FlowServices {
    pub llm: Arc<dyn LlmClient>,
    pub model: ModelConfig,
    pub store: Arc<dyn ComplaintStore>,
    pub resources: Arc<dyn ResourceDirectory>,
    pub settings: FlowConfig,
}

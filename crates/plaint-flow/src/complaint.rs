//! The complaint interview graph.
//!
//! ```text
//!               continue
//! Extraction ------------> Generate
//!     |  \    summarize
//!     |   `--------------> Summarize
//!     |       reject
//!     `------------------> Reject
//! ```
//!
//! Each run is a single hop: extraction, then one leaf. The next user turn
//! starts a fresh run with the accumulated history.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use plaint_core::error::Result;

use crate::graph::{Flow, FlowOutcome};
use crate::nodes::{ExtractionNode, GenerateNode, RejectionNode, SummarizerNode};
use crate::services::FlowServices;
use crate::state::{RunStatus, SharedState};

/// Action labels produced by the extraction node.
pub mod actions {
    use crate::graph::Action;

    pub const CONTINUE: Action = Action::from_static("continue");
    pub const SUMMARIZE: Action = Action::from_static("summarize");
    pub const REJECT: Action = Action::from_static("reject");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStage {
    Extraction,
    Generate,
    Summarize,
    Reject,
}

impl ComplaintStage {
    /// Conversation status once a run ends at this stage.
    pub fn status(self) -> RunStatus {
        match self {
            ComplaintStage::Extraction => RunStatus::Pending,
            ComplaintStage::Generate => RunStatus::AwaitingInput,
            ComplaintStage::Summarize => RunStatus::Submitted,
            ComplaintStage::Reject => RunStatus::Closed,
        }
    }
}

pub type ComplaintFlow = Flow<ComplaintStage, SharedState>;

/// Wire the four complaint nodes into a flow starting at extraction.
pub fn complaint_flow(services: Arc<FlowServices>) -> ComplaintFlow {
    use ComplaintStage::*;

    let pacing = Duration::from_millis(services.settings.rejection_pacing_ms);
    let max_steps = services.settings.max_steps;

    Flow::new(Extraction)
        .node(Extraction, ExtractionNode::new(services.clone()))
        .node(Generate, GenerateNode::new(services.clone()))
        .node(Summarize, SummarizerNode::new(services))
        .node(Reject, RejectionNode::new(pacing))
        .edge(Extraction, actions::CONTINUE, Generate)
        .edge(Extraction, actions::SUMMARIZE, Summarize)
        .edge(Extraction, actions::REJECT, Reject)
        .with_max_steps(max_steps)
}

/// Run one turn and record the resulting status on the state.
pub async fn run_complaint(
    flow: &ComplaintFlow,
    state: &mut SharedState,
) -> Result<FlowOutcome<ComplaintStage>> {
    let outcome = flow.run(state).await?;
    state.status = outcome
        .last_node()
        .map(ComplaintStage::status)
        .unwrap_or_default();
    Ok(outcome)
}

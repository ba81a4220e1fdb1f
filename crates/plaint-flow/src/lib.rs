pub mod complaint;
pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod services;
pub mod state;
pub mod triage;

pub use complaint::{actions, complaint_flow, run_complaint, ComplaintFlow, ComplaintStage};
pub use graph::{Action, Flow, FlowOutcome, Node, Step};
pub use nodes::{is_complete, missing_fields};
pub use services::FlowServices;
pub use state::{RunStatus, SharedState};

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use plaint_core::error::Result;
use plaint_core::types::{transcript, ChatMessage, HistoryEntry, TaskSender};

use super::{missing_text_fields, relay_stream};
use crate::graph::{Action, Node};
use crate::prompts::clarify_prompt;
use crate::services::FlowServices;
use crate::state::SharedState;

/// Streams one acknowledgement-and-question turn.
pub struct GenerateNode {
    services: Arc<FlowServices>,
}

impl GenerateNode {
    pub fn new(services: Arc<FlowServices>) -> Self {
        Self { services }
    }
}

pub struct ClarifyInput {
    transcript: String,
    missing: Vec<&'static str>,
    quality: i64,
    queue: Option<TaskSender>,
}

impl Node<SharedState> for GenerateNode {
    type Prep = ClarifyInput;
    type Exec = String;

    fn name(&self) -> &'static str {
        "generate"
    }

    fn prepare<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<ClarifyInput>> {
        Box::pin(async move {
            let metadata = state.metadata();
            Ok(ClarifyInput {
                transcript: transcript(state.history()),
                missing: missing_text_fields(&metadata),
                quality: metadata.complaint_quality,
                queue: state.message_queue.clone(),
            })
        })
    }

    fn execute<'a>(&'a self, prep: &'a ClarifyInput) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let prompt = clarify_prompt(&prep.transcript, &prep.missing, prep.quality);
            let reply = relay_stream(
                self.services.llm.as_ref(),
                &self.services.model,
                vec![ChatMessage::user(prompt)],
                prep.queue.as_ref(),
            )
            .await?;

            if let Some(queue) = &prep.queue {
                queue.finish();
            }
            Ok(reply)
        })
    }

    fn finalize(&self, state: &mut SharedState, prep: ClarifyInput, reply: String) -> Result<Action> {
        info!(task_id = ?state.task_id, missing = ?prep.missing, "Asked for clarification");
        state.push_history(HistoryEntry::assistant(reply.clone()));
        state.response = Some(reply);
        Ok(Action::DEFAULT)
    }
}

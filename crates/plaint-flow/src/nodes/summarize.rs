use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{error, info};

use plaint_core::error::Result;
use plaint_core::types::{
    transcript, ChatMessage, ComplaintRecord, HistoryEntry, TaskMetadata, TaskSender,
};

use super::relay_stream;
use crate::graph::{Action, Node};
use crate::prompts::closing_prompt;
use crate::services::FlowServices;
use crate::state::SharedState;
use crate::triage::{map_category, map_urgency, sentiment_score};

pub const SAVING_STATUS: &str = "Saving your complaint to our database...\n\n";
pub const SAVED_STATUS: &str = "Complaint saved successfully!\n\n";
pub const LOOKUP_STATUS: &str = "Finding the right agencies for you...\n\n";
pub const SAVE_FAILED_MESSAGE: &str =
    "Sorry, we could not save your complaint right now. Please try again later.";

/// How many resources the closing message mentions.
const RESOURCE_LIMIT: usize = 2;

const TITLE_LIMIT: usize = 100;

/// Persists the complaint and streams the closing message.
pub struct SummarizerNode {
    services: Arc<FlowServices>,
}

impl SummarizerNode {
    pub fn new(services: Arc<FlowServices>) -> Self {
        Self { services }
    }
}

pub struct SummaryInput {
    record: ComplaintRecord,
    metadata: TaskMetadata,
    transcript: String,
    queue: Option<TaskSender>,
}

pub struct Summary {
    pub complaint_id: String,
    pub response: String,
}

/// Build the record to persist from the conversation and its metadata.
pub fn build_record(history: &[HistoryEntry], metadata: &TaskMetadata) -> ComplaintRecord {
    let original_text = history
        .iter()
        .filter_map(HistoryEntry::user_text)
        .collect::<Vec<_>>()
        .join(" ");
    let topic = metadata.complaint_topic.as_str();
    let location = metadata.complaint_location.as_str();

    ComplaintRecord {
        original_text,
        title: topic.chars().take(TITLE_LIMIT).collect(),
        category: map_category(topic).to_string(),
        subcategory: "general".to_string(),
        urgency: map_urgency(metadata.complaint_quality),
        status: "open".to_string(),
        location_description: location.to_string(),
        planning_area: location.to_string(),
        conversation_history: history.to_vec(),
        tags: vec![topic.to_lowercase()],
        keywords: vec![topic.to_lowercase(), location.to_lowercase()],
        sentiment_score: sentiment_score(metadata.complaint_quality),
    }
}

impl Node<SharedState> for SummarizerNode {
    type Prep = SummaryInput;
    type Exec = Summary;

    fn name(&self) -> &'static str {
        "summarize"
    }

    fn prepare<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<SummaryInput>> {
        Box::pin(async move {
            let metadata = state.metadata();
            Ok(SummaryInput {
                record: build_record(state.history(), &metadata),
                metadata,
                transcript: transcript(state.history()),
                queue: state.message_queue.clone(),
            })
        })
    }

    fn execute<'a>(&'a self, prep: &'a SummaryInput) -> BoxFuture<'a, Result<Summary>> {
        Box::pin(async move {
            let queue = prep.queue.as_ref();
            let status = |text: &str| {
                if let Some(queue) = queue {
                    queue.push(text);
                }
            };

            status(SAVING_STATUS);
            let complaint_id = match self.services.store.save_complaint(prep.record.clone()).await {
                Ok(id) => id,
                Err(e) => {
                    error!(error = %e, "Failed to save complaint");
                    if let Some(queue) = queue {
                        queue.fail(SAVE_FAILED_MESSAGE);
                    }
                    return Err(e);
                }
            };
            status(SAVED_STATUS);

            status(LOOKUP_STATUS);
            let mut resources = self
                .services
                .resources
                .resources_for_category(&prep.record.category);
            resources.truncate(RESOURCE_LIMIT);

            let prompt = closing_prompt(&prep.transcript, &prep.metadata, &complaint_id, &resources);
            let response = relay_stream(
                self.services.llm.as_ref(),
                &self.services.model,
                vec![ChatMessage::user(prompt)],
                queue,
            )
            .await?;

            if let Some(queue) = queue {
                queue.finish();
            }
            Ok(Summary {
                complaint_id,
                response,
            })
        })
    }

    fn finalize(&self, state: &mut SharedState, prep: SummaryInput, exec: Summary) -> Result<Action> {
        info!(
            task_id = ?state.task_id,
            complaint_id = %exec.complaint_id,
            category = %prep.record.category,
            "Complaint submitted"
        );
        state.push_history(HistoryEntry::assistant(exec.response.clone()));
        state.complaint_id = Some(exec.complaint_id);
        state.response = Some(exec.response);
        state.has_been_summarized = true;
        Ok(Action::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaint_core::types::Urgency;

    #[test]
    fn test_build_record() {
        let history = vec![
            HistoryEntry::user("Trains keep stalling"),
            HistoryEntry::assistant("Where?"),
            HistoryEntry::user("Bishan MRT"),
        ];
        let metadata = TaskMetadata {
            complaint_topic: "MRT Delays".into(),
            complaint_location: "Bishan".into(),
            complaint_summary: "Circle line stalls at rush hour.".into(),
            complaint_quality: 4,
        };

        let record = build_record(&history, &metadata);
        assert_eq!(record.original_text, "Trains keep stalling Bishan MRT");
        assert_eq!(record.title, "MRT Delays");
        assert_eq!(record.category, "transport");
        assert_eq!(record.subcategory, "general");
        assert_eq!(record.urgency, Urgency::High);
        assert_eq!(record.status, "open");
        assert_eq!(record.planning_area, "Bishan");
        assert_eq!(record.tags, vec!["mrt delays"]);
        assert_eq!(record.keywords, vec!["mrt delays", "bishan"]);
        assert_eq!(record.sentiment_score, 0.5);
        assert_eq!(record.conversation_history.len(), 3);
    }

    #[test]
    fn test_title_is_truncated() {
        let metadata = TaskMetadata {
            complaint_topic: "x".repeat(150),
            ..Default::default()
        };
        let record = build_record(&[], &metadata);
        assert_eq!(record.title.chars().count(), 100);
        assert_eq!(record.category, "general");
        assert_eq!(record.urgency, Urgency::Low);
    }
}

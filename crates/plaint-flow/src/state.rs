use serde::{Deserialize, Serialize};

use plaint_core::types::{HistoryEntry, MetadataHandle, TaskId, TaskMetadata, TaskSender};

/// Where a conversation stands after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Not run yet, or the run stopped before reaching a leaf.
    #[default]
    Pending,
    /// A clarifying question was asked; the next user turn starts a new run.
    AwaitingInput,
    /// The complaint was persisted.
    Submitted,
    /// The thread had already been concluded; input was turned away.
    Closed,
}

/// The record threaded through one complaint flow run.
///
/// History is append-only. The metadata handle is usually shared with the
/// task registry so readers outside the run observe extraction results.
#[derive(Debug, Clone)]
pub struct SharedState {
    history: Vec<HistoryEntry>,
    pub task_metadata: MetadataHandle,
    pub message_queue: Option<TaskSender>,
    pub task_id: Option<TaskId>,
    /// The thread was concluded on an earlier turn.
    pub has_been_summarized: bool,
    pub status: RunStatus,
    pub complaint_id: Option<String>,
    /// Full text streamed by the last responding node.
    pub response: Option<String>,
}

impl SharedState {
    pub fn new(history: Vec<HistoryEntry>, task_metadata: MetadataHandle) -> Self {
        Self {
            history,
            task_metadata,
            message_queue: None,
            task_id: None,
            has_been_summarized: false,
            status: RunStatus::Pending,
            complaint_id: None,
            response: None,
        }
    }

    /// Convenience for callers that do not share the metadata.
    pub fn with_metadata(history: Vec<HistoryEntry>, metadata: TaskMetadata) -> Self {
        Self::new(history, MetadataHandle::new(metadata))
    }

    pub fn with_queue(mut self, queue: TaskSender) -> Self {
        self.message_queue = Some(queue);
        self
    }

    pub fn with_task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn summarized(mut self, has_been_summarized: bool) -> Self {
        self.has_been_summarized = has_been_summarized;
        self
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn into_history(self) -> Vec<HistoryEntry> {
        self.history
    }

    pub fn metadata(&self) -> TaskMetadata {
        self.task_metadata.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_appends_in_order() {
        let mut state = SharedState::with_metadata(
            vec![HistoryEntry::user("Bus 12 never comes")],
            TaskMetadata::default(),
        );
        state.push_history(HistoryEntry::assistant("Which stop?"));
        state.push_history(HistoryEntry::user("Bedok interchange"));

        let texts: Vec<_> = state.history().iter().filter_map(|e| e.user_text()).collect();
        assert_eq!(texts, vec!["Bus 12 never comes", "Bedok interchange"]);
        assert_eq!(state.into_history().len(), 3);
    }

    #[test]
    fn test_metadata_is_shared_with_handle() {
        let handle = MetadataHandle::new(TaskMetadata::default());
        let state = SharedState::new(vec![], handle.clone());

        let mut updated = state.metadata();
        updated.complaint_topic = "Noise".into();
        state.task_metadata.replace(updated);

        assert_eq!(handle.snapshot().complaint_topic, "Noise");
        assert_eq!(state.status, RunStatus::Pending);
    }
}

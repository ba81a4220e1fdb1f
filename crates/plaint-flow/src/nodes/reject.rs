use std::time::Duration;

use futures::future::BoxFuture;
use tracing::info;

use plaint_core::error::Result;
use plaint_core::types::TaskSender;

use crate::graph::{Action, Node};
use crate::state::SharedState;

pub const REJECTION_MESSAGE: &str =
    "This complaint thread has ended. Create a new chat if you want to start another complaint!";

/// Turns away input on a thread that was already concluded.
///
/// The message is static but goes out word by word, paced like generated text.
pub struct RejectionNode {
    pacing: Duration,
}

impl RejectionNode {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }
}

impl Node<SharedState> for RejectionNode {
    type Prep = Option<TaskSender>;
    type Exec = String;

    fn name(&self) -> &'static str {
        "reject"
    }

    fn prepare<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<Option<TaskSender>>> {
        Box::pin(async move { Ok(state.message_queue.clone()) })
    }

    fn execute<'a>(&'a self, queue: &'a Option<TaskSender>) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            if let Some(queue) = queue {
                for (i, word) in REJECTION_MESSAGE.split_whitespace().enumerate() {
                    if i > 0 && !self.pacing.is_zero() {
                        tokio::time::sleep(self.pacing).await;
                    }
                    queue.push(format!("{} ", word));
                }
                queue.finish();
            }
            Ok(REJECTION_MESSAGE.to_string())
        })
    }

    fn finalize(
        &self,
        state: &mut SharedState,
        _queue: Option<TaskSender>,
        _message: String,
    ) -> Result<Action> {
        info!(task_id = ?state.task_id, "Rejected input on concluded thread");
        Ok(Action::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Step;
    use plaint_core::types::{task_channel, StreamItem, TaskMetadata};
    use std::time::Instant;

    #[tokio::test]
    async fn test_streams_words_with_pacing_then_sentinel() {
        let (tx, mut rx) = task_channel();
        let mut state = SharedState::with_metadata(vec![], TaskMetadata::default()).with_queue(tx);
        let node = RejectionNode::new(Duration::from_millis(5));

        let started = Instant::now();
        let action = Step::run(&node, &mut state).await.unwrap();
        assert_eq!(action, Action::DEFAULT);

        let words = REJECTION_MESSAGE.split_whitespace().count();
        assert!(started.elapsed() >= Duration::from_millis(5 * (words as u64 - 1)));

        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        assert_eq!(items.len(), words + 1);
        assert_eq!(items[0], StreamItem::Chunk("This ".into()));
        assert_eq!(items.last(), Some(&StreamItem::End));
        assert!(state.history().is_empty());
        assert!(state.response.is_none());
    }
}

//! The four complaint nodes and the helpers they share.

pub mod extraction;
pub mod generate;
pub mod reject;
pub mod summarize;

pub use extraction::ExtractionNode;
pub use generate::GenerateNode;
pub use reject::RejectionNode;
pub use summarize::SummarizerNode;

use futures::StreamExt;
use tracing::{debug, warn};

use plaint_core::config::ModelConfig;
use plaint_core::error::Result;
use plaint_core::traits::LlmClient;
use plaint_core::types::{ChatMessage, StopReason, StreamDelta, TaskMetadata, TaskSender};

pub const TOPIC: &str = "complaint_topic";
pub const LOCATION: &str = "complaint_location";
pub const SUMMARY: &str = "complaint_summary";
pub const QUALITY: &str = "complaint_quality";

/// Text fields that are still empty.
pub fn missing_text_fields(metadata: &TaskMetadata) -> Vec<&'static str> {
    [
        (TOPIC, &metadata.complaint_topic),
        (LOCATION, &metadata.complaint_location),
        (SUMMARY, &metadata.complaint_summary),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(key, _)| key)
    .collect()
}

/// Every field that still needs work; quality counts as missing at or
/// below `threshold`.
pub fn missing_fields(metadata: &TaskMetadata, threshold: i64) -> Vec<&'static str> {
    let mut missing = missing_text_fields(metadata);
    if metadata.complaint_quality <= threshold {
        missing.push(QUALITY);
    }
    missing
}

/// All three text fields are present and quality clears the threshold.
pub fn is_complete(metadata: &TaskMetadata, threshold: i64) -> bool {
    missing_fields(metadata, threshold).is_empty()
}

/// Stream a completion, forwarding each text chunk to `queue`.
///
/// Returns the full text. Does not push the sentinel; the calling node ends
/// its own stream once all of its output is out.
pub(crate) async fn relay_stream(
    llm: &dyn LlmClient,
    model: &ModelConfig,
    messages: Vec<ChatMessage>,
    queue: Option<&TaskSender>,
) -> Result<String> {
    let mut stream = llm.chat_stream(model, messages).await?;
    let mut full = String::new();

    while let Some(delta) = stream.next().await {
        match delta? {
            StreamDelta::TextDelta(chunk) => {
                if chunk.is_empty() {
                    continue;
                }
                if let Some(queue) = queue {
                    queue.push(chunk.as_str());
                }
                full.push_str(&chunk);
            }
            StreamDelta::Usage {
                input_tokens,
                output_tokens,
            } => {
                debug!(model = %model.model_id, input_tokens, output_tokens, "Token usage");
            }
            StreamDelta::Stop(StopReason::EndTurn) => {}
            StreamDelta::Stop(reason) => {
                warn!(model = %model.model_id, reason = ?reason, chars = full.len(), "Completion cut short");
            }
        }
    }

    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::stream::{self, BoxStream};
    use plaint_core::types::{task_channel, StreamItem};
    use plaint_test_utils::{test_model, ScriptedLlm};

    /// Replays a fixed delta sequence, bookkeeping deltas included.
    struct FixedDeltas(Vec<StreamDelta>);

    impl LlmClient for FixedDeltas {
        fn chat_stream(
            &self,
            _config: &ModelConfig,
            _messages: Vec<ChatMessage>,
        ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
            let deltas: Vec<Result<StreamDelta>> = self.0.iter().cloned().map(Ok).collect();
            Box::pin(async move {
                Ok(Box::pin(stream::iter(deltas)) as BoxStream<'_, Result<StreamDelta>>)
            })
        }
    }

    fn metadata(topic: &str, location: &str, summary: &str, quality: i64) -> TaskMetadata {
        TaskMetadata {
            complaint_topic: topic.into(),
            complaint_location: location.into(),
            complaint_summary: summary.into(),
            complaint_quality: quality,
        }
    }

    #[test]
    fn test_missing_fields() {
        let empty = TaskMetadata::default();
        assert_eq!(missing_fields(&empty, 2), vec![TOPIC, LOCATION, SUMMARY, QUALITY]);

        let partial = metadata("Noise", "  ", "Loud works", 3);
        assert_eq!(missing_fields(&partial, 2), vec![LOCATION]);
        assert_eq!(missing_text_fields(&partial), vec![LOCATION]);
    }

    #[test]
    fn test_quality_at_threshold_is_missing() {
        let at = metadata("Noise", "Bishan", "Loud works", 2);
        assert_eq!(missing_fields(&at, 2), vec![QUALITY]);
        assert!(!is_complete(&at, 2));
        assert!(is_complete(&metadata("Noise", "Bishan", "Loud works", 3), 2));
    }

    #[tokio::test]
    async fn test_relay_stream_forwards_chunks_in_order() {
        let llm = ScriptedLlm::new(vec!["Which MRT line?"]);
        let (tx, mut rx) = task_channel();

        let text = relay_stream(&llm, &test_model("m"), vec![], Some(&tx))
            .await
            .unwrap();
        assert_eq!(text, "Which MRT line?");

        drop(tx);
        let mut chunks = Vec::new();
        while let Some(item) = rx.recv().await {
            chunks.push(item);
        }
        assert_eq!(
            chunks,
            vec![
                StreamItem::Chunk("Which ".into()),
                StreamItem::Chunk("MRT ".into()),
                StreamItem::Chunk("line?".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_relay_stream_skips_usage_and_stop() {
        let llm = FixedDeltas(vec![
            StreamDelta::Usage {
                input_tokens: 40,
                output_tokens: 3,
            },
            StreamDelta::TextDelta("Where ".into()),
            StreamDelta::TextDelta(String::new()),
            StreamDelta::TextDelta("exactly?".into()),
            StreamDelta::Stop(StopReason::MaxTokens),
        ]);
        let (tx, mut rx) = task_channel();

        let text = relay_stream(&llm, &test_model("m"), vec![], Some(&tx))
            .await
            .unwrap();
        assert_eq!(text, "Where exactly?");

        drop(tx);
        let mut chunks = 0;
        while let Some(item) = rx.recv().await {
            assert!(matches!(item, StreamItem::Chunk(_)));
            chunks += 1;
        }
        assert_eq!(chunks, 2);
    }
}

use serde::{Deserialize, Serialize};

use plaint_core::types::{coerce_quality, HistoryEntry, TaskMetadata};

/// Body of `POST /api/chat`.
///
/// The client sends the whole conversation and the metadata it was last
/// given on every turn; the server keeps nothing between turns.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
    #[serde(default, rename = "threadMetaData")]
    pub thread_metadata: Option<ThreadMetadata>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Client-side spelling of the task metadata.
#[derive(Debug, Default, Deserialize)]
pub struct ThreadMetadata {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub quality: serde_json::Value,
}

impl From<ThreadMetadata> for TaskMetadata {
    fn from(meta: ThreadMetadata) -> Self {
        TaskMetadata {
            complaint_topic: meta.topic.unwrap_or_default(),
            complaint_location: meta.location.unwrap_or_default(),
            complaint_summary: meta.summary.unwrap_or_default(),
            complaint_quality: coerce_quality(&meta.quality),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub task_id: String,
}

/// One server-sent event on a task stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content {
        content: String,
    },
    Error {
        error: String,
    },
    Metadata {
        #[serde(rename = "type")]
        kind: &'static str,
        #[serde(rename = "threadMetaData")]
        thread_metadata: TaskMetadata,
    },
    Done {
        done: bool,
    },
}

impl StreamEvent {
    pub fn metadata(thread_metadata: TaskMetadata) -> Self {
        StreamEvent::Metadata {
            kind: "metadata",
            thread_metadata,
        }
    }

    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_minimal() {
        let req: ChatRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "Bus 12 never came"}]
        }))
        .unwrap();
        assert_eq!(req.messages, vec![HistoryEntry::user("Bus 12 never came")]);
        assert!(req.thread_metadata.is_none());
        assert!(req.task_id.is_none());
    }

    #[test]
    fn test_thread_metadata_is_lenient() {
        let req: ChatRequest = serde_json::from_value(json!({
            "messages": [],
            "threadMetaData": {"topic": "Noise", "summary": null, "quality": "4"}
        }))
        .unwrap();
        let meta = TaskMetadata::from(req.thread_metadata.unwrap());
        assert_eq!(meta.complaint_topic, "Noise");
        assert_eq!(meta.complaint_summary, "");
        assert_eq!(meta.complaint_location, "");
        assert_eq!(meta.complaint_quality, 4);
    }

    #[test]
    fn test_stream_event_shapes() {
        let to_json = |e: &StreamEvent| serde_json::to_value(e).unwrap();

        assert_eq!(
            to_json(&StreamEvent::Content {
                content: "Hi ".into()
            }),
            json!({"content": "Hi "})
        );
        assert_eq!(
            to_json(&StreamEvent::Error {
                error: "boom".into()
            }),
            json!({"error": "boom"})
        );
        assert_eq!(to_json(&StreamEvent::done()), json!({"done": true}));

        let meta = to_json(&StreamEvent::metadata(TaskMetadata {
            complaint_topic: "Noise".into(),
            complaint_quality: 3,
            ..Default::default()
        }));
        assert_eq!(meta["type"], "metadata");
        assert_eq!(meta["threadMetaData"]["complaint_topic"], "Noise");
        assert_eq!(meta["threadMetaData"]["complaint_quality"], 3);
    }
}

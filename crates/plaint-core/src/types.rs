use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque identifier correlating a background flow run with its stream consumer.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh `task_<8 hex>` identifier.
    pub fn new() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("task_{}", &hex[..8]))
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One record of the conversation history.
///
/// Chat clients send role-tagged turns; the probing style of interview
/// records question/answer pairs instead. Both shapes may appear in the
/// same history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Turn { role: Role, content: String },
    Exchange { question: String, answer: String },
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self::Turn {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Turn {
            role: Role::Assistant,
            content: text.into(),
        }
    }

    /// Text the citizen contributed in this entry, if any.
    pub fn user_text(&self) -> Option<&str> {
        match self {
            Self::Turn {
                role: Role::User,
                content,
            } => Some(content),
            Self::Turn { .. } => None,
            Self::Exchange { answer, .. } => Some(answer),
        }
    }

    /// Render the entry as transcript lines for a prompt.
    pub fn transcript_line(&self) -> String {
        match self {
            Self::Turn { role, content } => format!("{}: {}", role.as_str(), content),
            Self::Exchange { question, answer } => format!("Q: {}\nA: {}", question, answer),
        }
    }
}

/// Render a whole history as a chronological transcript.
pub fn transcript(history: &[HistoryEntry]) -> String {
    history
        .iter()
        .map(HistoryEntry::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A chat message sent to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Stop reason from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ContentFilter,
}

/// A streaming delta from the LLM.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDelta {
    /// A chunk of text content.
    TextDelta(String),

    /// The response is complete.
    Stop(StopReason),

    /// Usage information.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// Structured complaint fields gathered during the interview.
///
/// Exactly these four keys exist; extraction only ever overwrites them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub complaint_topic: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub complaint_location: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub complaint_summary: String,
    #[serde(default, deserialize_with = "quality_from_value")]
    pub complaint_quality: i64,
}

fn text_or_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn quality_from_value<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(coerce_quality(&value))
}

/// Coerce a loosely typed quality score to an integer.
///
/// Anything that does not read as an integer becomes 0.
pub fn coerce_quality(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        serde_json::Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Task metadata shared between a flow run and the task registry.
///
/// Writes made by a node are visible to any holder of a clone.
#[derive(Debug, Clone, Default)]
pub struct MetadataHandle(Arc<RwLock<TaskMetadata>>);

impl MetadataHandle {
    pub fn new(metadata: TaskMetadata) -> Self {
        Self(Arc::new(RwLock::new(metadata)))
    }

    pub fn snapshot(&self) -> TaskMetadata {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, metadata: TaskMetadata) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = metadata;
    }

    /// Whether both handles point at the same metadata.
    pub fn shares_with(&self, other: &MetadataHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// An item on a task's output queue.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A chunk of human-readable output.
    Chunk(String),
    /// The run failed; carries a message safe to show the client.
    Error(String),
    /// End-of-stream sentinel.
    End,
}

pub type TaskReceiver = mpsc::UnboundedReceiver<StreamItem>;

/// Producer side of a task's output queue.
///
/// Clones share one sentinel flag: once any clone ends the stream, further
/// pushes from every clone are dropped.
#[derive(Debug, Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<StreamItem>,
    ended: Arc<AtomicBool>,
}

/// Create an unbounded FIFO output queue.
pub fn task_channel() -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TaskSender {
            tx,
            ended: Arc::new(AtomicBool::new(false)),
        },
        rx,
    )
}

impl TaskSender {
    /// Push a chunk. Returns false if the stream already ended or nobody listens.
    pub fn push(&self, chunk: impl Into<String>) -> bool {
        if self.is_finished() {
            return false;
        }
        self.tx.send(StreamItem::Chunk(chunk.into())).is_ok()
    }

    /// Push the sentinel. Returns true only for the call that ended the stream.
    pub fn finish(&self) -> bool {
        if self.ended.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Consumer may be gone; the run carries on regardless
        let _ = self.tx.send(StreamItem::End);
        true
    }

    /// Push an error item followed by the sentinel, unless already ended.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        if self.ended.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.tx.send(StreamItem::Error(message.into()));
        let _ = self.tx.send(StreamItem::End);
        true
    }

    pub fn is_finished(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Whether both senders feed the same queue.
    pub fn same_queue(&self, other: &TaskSender) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// Urgency derived from complaint quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Urgency::High,
            "medium" => Urgency::Medium,
            _ => Urgency::Low,
        }
    }
}

/// A complaint ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    pub original_text: String,
    pub title: String,
    pub category: String,
    pub subcategory: String,
    pub urgency: Urgency,
    pub status: String,
    pub location_description: String,
    pub planning_area: String,
    pub conversation_history: Vec<HistoryEntry>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub sentiment_score: f64,
}

/// A persisted complaint with its durable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredComplaint {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: ComplaintRecord,
}

/// A government contact surfaced to the citizen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub contact: String,
    pub website: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_format() {
        let id = TaskId::new();
        assert!(id.as_str().starts_with("task_"));
        assert_eq!(id.as_str().len(), "task_".len() + 8);
        assert_ne!(id, TaskId::new());
    }

    #[test]
    fn test_history_entry_shapes() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(
            r#"[
                {"role": "user", "content": "MRT delayed at Dhoby Ghaut"},
                {"question": "Which line?", "answer": "Circle Line"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0], HistoryEntry::user("MRT delayed at Dhoby Ghaut"));
        assert_eq!(entries[1].user_text(), Some("Circle Line"));
        assert_eq!(HistoryEntry::assistant("hi").user_text(), None);
    }

    #[test]
    fn test_transcript_is_chronological() {
        let history = vec![HistoryEntry::user("first"), HistoryEntry::assistant("second")];
        assert_eq!(transcript(&history), "user: first\nassistant: second");
    }

    #[test]
    fn test_coerce_quality() {
        assert_eq!(coerce_quality(&serde_json::json!(4)), 4);
        assert_eq!(coerce_quality(&serde_json::json!("3")), 3);
        assert_eq!(coerce_quality(&serde_json::json!(4.7)), 4);
        assert_eq!(coerce_quality(&serde_json::json!("extracted quality")), 0);
        assert_eq!(coerce_quality(&serde_json::json!(null)), 0);
    }

    #[test]
    fn test_metadata_tolerates_nulls_and_strings() {
        let meta: TaskMetadata = serde_json::from_str(
            r#"{"complaint_topic": null, "complaint_location": "Bishan", "complaint_quality": "5"}"#,
        )
        .unwrap();
        assert_eq!(meta.complaint_topic, "");
        assert_eq!(meta.complaint_location, "Bishan");
        assert_eq!(meta.complaint_summary, "");
        assert_eq!(meta.complaint_quality, 5);
    }

    #[test]
    fn test_metadata_handle_shares_writes() {
        let handle = MetadataHandle::default();
        let other = handle.clone();
        let mut meta = handle.snapshot();
        meta.complaint_topic = "Construction noise".into();
        handle.replace(meta);
        assert_eq!(other.snapshot().complaint_topic, "Construction noise");
        assert!(handle.shares_with(&other));
        assert!(!handle.shares_with(&MetadataHandle::default()));
    }

    #[tokio::test]
    async fn test_sender_sentinel_is_last() {
        let (tx, mut rx) = task_channel();
        assert!(tx.push("a"));
        assert!(tx.finish());
        assert!(!tx.push("late"));
        assert!(!tx.finish());
        assert!(!tx.fail("too late"));
        drop(tx);

        assert_eq!(rx.recv().await, Some(StreamItem::Chunk("a".into())));
        assert_eq!(rx.recv().await, Some(StreamItem::End));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_sender_fail_emits_error_then_sentinel() {
        let (tx, mut rx) = task_channel();
        let clone = tx.clone();
        assert!(clone.fail("LLM unavailable"));
        assert!(tx.is_finished());
        assert_eq!(rx.recv().await, Some(StreamItem::Error("LLM unavailable".into())));
        assert_eq!(rx.recv().await, Some(StreamItem::End));
    }
}

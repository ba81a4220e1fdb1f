//! Test doubles shared across Plaint crates.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};

use plaint_core::config::ModelConfig;
use plaint_core::error::{PlaintError, Result};
use plaint_core::traits::{ComplaintStore, LlmClient, ResourceDirectory};
use plaint_core::types::*;

/// A model config pointing nowhere, for clients that ignore it.
pub fn test_model(model_id: &str) -> ModelConfig {
    ModelConfig {
        provider: "openai".to_string(),
        model_id: model_id.to_string(),
        api_key: None,
        base_url: None,
        max_tokens: 256,
        temperature: 0.0,
        extra_headers: HashMap::new(),
        retry: None,
    }
}

enum Reply {
    Text(String),
    // Streams the partial text, then a stream error
    Broken(String),
}

#[derive(Default)]
struct Script {
    failures: VecDeque<PlaintError>,
    replies: VecDeque<Reply>,
    requests: Vec<Vec<ChatMessage>>,
}

/// LLM double replaying canned responses in order.
///
/// Queued failures are returned before any reply. Replies stream word by
/// word so relays see several chunks. Clones share the script.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    script: Arc<Mutex<Script>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedLlm {
    pub fn new<I, T>(replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let llm = Self::default();
        for reply in replies {
            llm.push_reply(reply);
        }
        llm
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock().replies.push_back(Reply::Text(reply.into()));
    }

    /// Next call fails to establish a stream.
    pub fn fail_once(&self, error: PlaintError) {
        self.lock().failures.push_back(error);
    }

    /// Next reply streams `partial` and then breaks.
    pub fn break_stream_once(&self, partial: impl Into<String>) {
        self.lock().replies.push_back(Reply::Broken(partial.into()));
    }

    /// Number of `chat_stream` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages of every call, in call order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn word_chunks(text: &str) -> Vec<Result<StreamDelta>> {
    text.split_inclusive(' ')
        .map(|w| Ok(StreamDelta::TextDelta(w.to_string())))
        .collect()
}

impl LlmClient for ScriptedLlm {
    fn chat_stream(
        &self,
        _config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.lock();
        script.requests.push(messages);

        let outcome = if let Some(err) = script.failures.pop_front() {
            Err(err)
        } else {
            match script.replies.pop_front() {
                Some(Reply::Text(text)) => {
                    let mut deltas = word_chunks(&text);
                    deltas.push(Ok(StreamDelta::Stop(StopReason::EndTurn)));
                    Ok(deltas)
                }
                Some(Reply::Broken(partial)) => {
                    let mut deltas = word_chunks(&partial);
                    deltas.push(Err(PlaintError::LlmStream("connection reset".into())));
                    Ok(deltas)
                }
                None => Err(PlaintError::LlmRequest("no scripted reply left".into())),
            }
        };
        drop(script);

        Box::pin(async move {
            let deltas = outcome?;
            Ok(Box::pin(stream::iter(deltas)) as BoxStream<'_, Result<StreamDelta>>)
        })
    }
}

/// In-memory complaint store.
#[derive(Clone, Default)]
pub struct MemoryComplaintStore {
    complaints: Arc<Mutex<Vec<StoredComplaint>>>,
    categories: Arc<Mutex<Option<Vec<String>>>>,
    fail_saves: Arc<Mutex<Option<String>>>,
    fail_categories: Arc<Mutex<bool>>,
}

impl MemoryComplaintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report these categories instead of deriving them from saved records.
    pub fn with_categories(self, categories: &[&str]) -> Self {
        *lock(&self.categories) = Some(categories.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Every save fails with a database error carrying `message`.
    pub fn failing_saves(self, message: &str) -> Self {
        *lock(&self.fail_saves) = Some(message.to_string());
        self
    }

    /// Category lookups fail.
    pub fn failing_categories(self) -> Self {
        *lock(&self.fail_categories) = true;
        self
    }

    pub fn saved(&self) -> Vec<StoredComplaint> {
        lock(&self.complaints).clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ComplaintStore for MemoryComplaintStore {
    fn save_complaint(&self, record: ComplaintRecord) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            if let Some(message) = lock(&self.fail_saves).clone() {
                return Err(PlaintError::Database(message));
            }
            let id = uuid::Uuid::new_v4().to_string();
            lock(&self.complaints).push(StoredComplaint {
                id: id.clone(),
                created_at: chrono::Utc::now(),
                record,
            });
            Ok(id)
        })
    }

    fn existing_categories(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            if *lock(&self.fail_categories) {
                return Err(PlaintError::Database("categories unavailable".into()));
            }
            if let Some(categories) = lock(&self.categories).clone() {
                return Ok(categories);
            }
            let mut categories: Vec<String> = lock(&self.complaints)
                .iter()
                .map(|c| c.record.category.clone())
                .collect();
            categories.sort();
            categories.dedup();
            Ok(categories)
        })
    }

    fn get_complaint(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredComplaint>>> {
        let id = id.to_string();
        Box::pin(async move { Ok(lock(&self.complaints).iter().find(|c| c.id == id).cloned()) })
    }
}

/// Resource directory returning the same list for every category.
#[derive(Clone, Default)]
pub struct FixedResources(pub Vec<Resource>);

impl FixedResources {
    /// Three placeholder agencies.
    pub fn sample() -> Self {
        Self(
            ["Agency One", "Agency Two", "Agency Three"]
                .iter()
                .enumerate()
                .map(|(i, name)| Resource {
                    name: name.to_string(),
                    contact: format!("6000 000{}", i + 1),
                    website: format!("https://agency{}.example.sg", i + 1),
                    description: format!("{} helpline", name),
                })
                .collect(),
        )
    }
}

impl ResourceDirectory for FixedResources {
    fn resources_for_category(&self, _category: &str) -> Vec<Resource> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_llm_order() {
        let llm = ScriptedLlm::new(vec!["one two", "three"]);
        let config = test_model("m");
        assert_eq!(llm.complete(&config, vec![]).await.unwrap(), "one two");
        assert_eq!(llm.complete(&config, vec![]).await.unwrap(), "three");
        assert!(llm.complete(&config, vec![]).await.is_err());
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_broken_stream_errors() {
        let llm = ScriptedLlm::default();
        llm.break_stream_once("partial");
        assert!(llm.complete(&test_model("m"), vec![]).await.is_err());
    }
}

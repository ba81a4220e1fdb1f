use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// LLM client for streaming text completion.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    ///
    /// The stream is finite and not restartable; retrying needs a fresh call.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;

    /// Send a chat request and collect the full response text.
    fn complete(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();
        Box::pin(async move {
            let mut stream = self.chat_stream(&config, messages).await?;
            let mut text = String::new();
            while let Some(delta) = stream.next().await {
                if let StreamDelta::TextDelta(chunk) = delta? {
                    text.push_str(&chunk);
                }
            }
            Ok(text)
        })
    }
}

/// Complaint persistence backend.
pub trait ComplaintStore: Send + Sync + 'static {
    /// Persist a complaint and return its durable identifier.
    fn save_complaint(&self, record: ComplaintRecord) -> BoxFuture<'_, Result<String>>;

    /// Distinct categories of complaints stored so far (may be empty).
    fn existing_categories(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Load a stored complaint by id.
    fn get_complaint(&self, id: &str) -> BoxFuture<'_, Result<Option<StoredComplaint>>>;
}

/// Category-specific contact lookup. Always returns at least a general list.
pub trait ResourceDirectory: Send + Sync + 'static {
    fn resources_for_category(&self, category: &str) -> Vec<Resource>;
}

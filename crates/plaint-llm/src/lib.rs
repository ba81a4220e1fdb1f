pub mod providers;
pub mod retry;
pub mod streaming;

use std::sync::Arc;

use plaint_core::config::AppConfig;
use plaint_core::traits::LlmClient;

pub use providers::openai::OpenAiClient;
pub use retry::RetryingClient;

/// Build the LLM gateway described by the config.
///
/// Every provider speaks the OpenAI-compatible protocol. A retrying wrapper
/// is added when the primary model has a retry policy or fallbacks exist.
pub fn build_client(config: &AppConfig) -> Arc<dyn LlmClient> {
    let primary: Box<dyn LlmClient> = Box::new(OpenAiClient::new());

    if config.model.retry.is_none() && config.fallback_models.is_empty() {
        return Arc::from(primary);
    }

    let fallbacks = config
        .fallback_models
        .iter()
        .map(|fb| (fb.clone(), Box::new(OpenAiClient::new()) as Box<dyn LlmClient>))
        .collect();
    let retry = config.model.retry.clone().unwrap_or_default();

    Arc::new(RetryingClient::new(primary, fallbacks, retry))
}

use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tracing::{info, warn};

use plaint_core::config::{ModelConfig, RetryConfig};
use plaint_core::error::{PlaintError, Result};
use plaint_core::traits::LlmClient;
use plaint_core::types::*;

/// An LLM client that retries failed requests and falls back to alternative models.
///
/// Only stream establishment is retried. Once deltas start flowing, errors
/// surface to the caller unchanged.
pub struct RetryingClient {
    primary: Box<dyn LlmClient>,
    fallbacks: Vec<(ModelConfig, Box<dyn LlmClient>)>,
    retry_config: RetryConfig,
}

impl RetryingClient {
    pub fn new(
        primary: Box<dyn LlmClient>,
        fallbacks: Vec<(ModelConfig, Box<dyn LlmClient>)>,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            primary,
            fallbacks,
            retry_config,
        }
    }
}

fn is_retryable(e: &PlaintError) -> bool {
    match e {
        PlaintError::LlmRequest(msg) => {
            msg.contains("429")
                || msg.contains("500")
                || msg.contains("502")
                || msg.contains("503")
                || msg.contains("timeout")
                || msg.contains("connection")
        }
        PlaintError::LlmStream(_) => true,
        _ => false,
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = config
        .initial_backoff_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_backoff_ms);
    // Jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl LlmClient for RetryingClient {
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        let config = config.clone();

        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;

            let mut last_err = None;
            for attempt in 0..=max_retries {
                match self.primary.chat_stream(&config, messages.clone()).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => {
                        if is_retryable(&e) && attempt < max_retries {
                            let backoff = calculate_backoff(attempt, &self.retry_config);
                            warn!(
                                attempt = attempt + 1,
                                max_retries,
                                backoff_ms = backoff.as_millis() as u64,
                                error = %e,
                                "Retrying LLM request"
                            );
                            tokio::time::sleep(backoff).await;
                            last_err = Some(e);
                            continue;
                        }
                        last_err = Some(e);
                        break;
                    }
                }
            }

            if !self.fallbacks.is_empty() {
                info!("Primary LLM exhausted, trying fallback models");
            }
            for (fb_config, fb_client) in &self.fallbacks {
                match fb_client.chat_stream(fb_config, messages.clone()).await {
                    Ok(stream) => {
                        info!(
                            model = %fb_config.model_id,
                            provider = %fb_config.provider,
                            "Fell back to alternative model"
                        );
                        return Ok(stream);
                    }
                    Err(e) => {
                        warn!(
                            model = %fb_config.model_id,
                            error = %e,
                            "Fallback model also failed"
                        );
                    }
                }
            }

            Err(last_err.unwrap_or_else(|| PlaintError::LlmRequest("All providers failed".into())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaint_test_utils::{test_model as model, ScriptedLlm};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&PlaintError::LlmRequest("HTTP 429 Too Many Requests".into())));
        assert!(is_retryable(&PlaintError::LlmStream("reset".into())));
        assert!(!is_retryable(&PlaintError::LlmRequest("HTTP 401 Unauthorized".into())));
        assert!(!is_retryable(&PlaintError::Config("bad".into())));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff_ms: 1000,
            max_backoff_ms: 4000,
        };
        let d = calculate_backoff(8, &config);
        assert!(d <= Duration::from_millis(4800));
        assert!(d >= Duration::from_millis(3200));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let llm = ScriptedLlm::new(vec!["ok"]);
        for _ in 0..2 {
            llm.fail_once(PlaintError::LlmRequest("HTTP 503".into()));
        }
        let client = RetryingClient::new(Box::new(llm.clone()), vec![], fast_retry(3));

        let text = client.complete(&model("gpt-4o-mini"), vec![]).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_goes_to_fallback() {
        let primary = ScriptedLlm::new(Vec::<&str>::new());
        primary.fail_once(PlaintError::LlmRequest("HTTP 401".into()));
        let fallback = ScriptedLlm::new(vec!["from fallback"]);

        let client = RetryingClient::new(
            Box::new(primary.clone()),
            vec![(model("backup"), Box::new(fallback.clone()) as Box<dyn LlmClient>)],
            fast_retry(3),
        );

        let text = client.complete(&model("gpt-4o-mini"), vec![]).await.unwrap();
        assert_eq!(text, "from fallback");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_returns_last_error() {
        let primary = ScriptedLlm::new(Vec::<&str>::new());
        for _ in 0..2 {
            primary.fail_once(PlaintError::LlmRequest("HTTP 500".into()));
        }
        let client = RetryingClient::new(Box::new(primary.clone()), vec![], fast_retry(1));

        let err = client.complete(&model("gpt-4o-mini"), vec![]).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert_eq!(primary.calls(), 2);
    }
}

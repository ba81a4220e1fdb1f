use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use plaint_core::config::ModelConfig;
use plaint_core::error::{PlaintError, Result};
use plaint_core::traits::LlmClient;
use plaint_core::types::*;

use crate::streaming::{SseEvent, SseStream};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const COMPLETIONS_PATH: &str = "/chat/completions";

/// OpenAI-compatible client. Works with OpenAI, Ollama, vLLM, Groq, OpenRouter, etc.
pub struct OpenAiClient {
    http: Client,
}

impl OpenAiClient {
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(concat!("plaint/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http }
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

// Request types
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OaiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

impl<'a> ChatRequest<'a> {
    fn streaming(config: &'a ModelConfig, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: &config.model_id,
            messages: convert_messages(messages),
            max_tokens: config.max_tokens,
            // Always sent: 0.0 is a deliberate setting, not "unset"
            temperature: config.temperature,
            stream: true,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct OaiMessage {
    role: &'static str,
    content: String,
}

// Response types
#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDeltaContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct StreamDeltaContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StreamUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Resolve the completions endpoint from an optional base URL.
///
/// Accepts either an API root (`https://host/v1`) or a full endpoint.
pub(crate) fn completions_url(base_url: Option<&str>) -> String {
    let base = base_url
        .map(|b| b.trim_end_matches('/'))
        .filter(|b| !b.is_empty())
        .unwrap_or(OPENAI_BASE_URL);
    if base.ends_with(COMPLETIONS_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, COMPLETIONS_PATH)
    }
}

pub(crate) fn convert_messages(messages: Vec<ChatMessage>) -> Vec<OaiMessage> {
    messages
        .into_iter()
        .map(|msg| OaiMessage {
            role: msg.role.as_str(),
            content: msg.content,
        })
        .collect()
}

pub(crate) fn parse_chunk(event: SseEvent) -> Vec<Result<StreamDelta>> {
    if event.data.trim() == "[DONE]" {
        return vec![];
    }

    let parsed: std::result::Result<StreamChunk, _> = serde_json::from_str(&event.data);
    match parsed {
        Ok(chunk) => {
            let mut deltas = Vec::new();

            if let Some(usage) = chunk.usage {
                deltas.push(Ok(StreamDelta::Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                }));
            }

            let choice = match chunk.choices.into_iter().next() {
                Some(c) => c,
                None => return deltas,
            };

            if let Some(text) = choice.delta.content {
                if !text.is_empty() {
                    deltas.push(Ok(StreamDelta::TextDelta(text)));
                }
            }

            if let Some(reason) = choice.finish_reason {
                let stop = match reason.as_str() {
                    "length" => StopReason::MaxTokens,
                    "content_filter" => StopReason::ContentFilter,
                    _ => StopReason::EndTurn,
                };
                deltas.push(Ok(StreamDelta::Stop(stop)));
            }

            deltas
        }
        Err(e) => {
            warn!(data = %event.data, error = %e, "Failed to parse OpenAI SSE chunk");
            vec![]
        }
    }
}

impl LlmClient for OpenAiClient {
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        let config = config.clone();

        Box::pin(async move {
            let url = completions_url(config.base_url.as_deref());

            let body = ChatRequest::streaming(&config, messages);

            debug!(model = %config.model_id, url = %url, "Sending chat completion request");

            let mut req = self.http.post(&url).json(&body);

            if let Some(api_key) = &config.api_key {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }

            for (k, v) in &config.extra_headers {
                req = req.header(k.as_str(), v.as_str());
            }

            let response = req
                .send()
                .await
                .map_err(|e| PlaintError::LlmRequest(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(PlaintError::LlmRequest(format!("HTTP {}: {}", status, body)));
            }

            let sse_stream = SseStream::new(response.bytes_stream());

            let delta_stream = sse_stream
                .map(|event| match event {
                    Ok(event) => futures::stream::iter(parse_chunk(event)),
                    Err(e) => futures::stream::iter(vec![Err(e)]),
                })
                .flatten();

            Ok(Box::pin(delta_stream) as BoxStream<'_, Result<StreamDelta>>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event_type: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url(None),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url(Some("http://localhost:11434/v1/")),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            completions_url(Some("https://proxy.example/v1/chat/completions")),
            "https://proxy.example/v1/chat/completions"
        );
        assert_eq!(
            completions_url(Some("")),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_convert_messages_roles() {
        let out = convert_messages(vec![
            ChatMessage {
                role: Role::System,
                content: "be brief".into(),
            },
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ]);
        let roles: Vec<_> = out.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
        assert_eq!(out[1].content, "hello");
    }

    #[test]
    fn test_request_sends_zero_temperature() {
        let mut config = plaint_test_utils::test_model("gpt-4o-mini");
        config.temperature = 0.0;
        let body = serde_json::to_value(ChatRequest::streaming(
            &config,
            vec![ChatMessage::user("hi")],
        ))
        .unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_parse_text_delta() {
        let deltas = parse_chunk(event(
            r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#,
        ));
        assert_eq!(deltas.len(), 1);
        assert_eq!(
            deltas[0].as_ref().unwrap(),
            &StreamDelta::TextDelta("Hel".into())
        );
    }

    #[test]
    fn test_parse_finish_reason() {
        let deltas = parse_chunk(event(r#"{"choices":[{"delta":{},"finish_reason":"length"}]}"#));
        assert_eq!(
            deltas[0].as_ref().unwrap(),
            &StreamDelta::Stop(StopReason::MaxTokens)
        );
    }

    #[test]
    fn test_parse_usage_only_chunk() {
        let deltas = parse_chunk(event(
            r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":5}}"#,
        ));
        assert_eq!(
            deltas[0].as_ref().unwrap(),
            &StreamDelta::Usage {
                input_tokens: 12,
                output_tokens: 5
            }
        );
    }

    #[test]
    fn test_parse_done_and_garbage() {
        assert!(parse_chunk(event("[DONE]")).is_empty());
        assert!(parse_chunk(event("not json")).is_empty());
    }
}

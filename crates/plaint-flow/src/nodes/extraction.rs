use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use plaint_core::error::Result;
use plaint_core::types::{coerce_quality, transcript, ChatMessage, TaskMetadata};

use super::{missing_fields, missing_text_fields, LOCATION, QUALITY, SUMMARY, TOPIC};
use crate::complaint::actions;
use crate::graph::{Action, Node};
use crate::prompts::extraction_prompt;
use crate::services::FlowServices;
use crate::state::SharedState;

/// Decision hub: extracts complaint fields and picks the next node.
pub struct ExtractionNode {
    services: Arc<FlowServices>,
}

impl ExtractionNode {
    pub fn new(services: Arc<FlowServices>) -> Self {
        Self { services }
    }

    fn threshold(&self) -> i64 {
        self.services.settings.quality_threshold
    }

    async fn categories(&self) -> Vec<String> {
        match self.services.store.existing_categories().await {
            Ok(categories) if !categories.is_empty() => categories,
            Ok(_) => self.services.settings.default_categories.clone(),
            Err(e) => {
                warn!(error = %e, "Could not load stored categories, using defaults");
                self.services.settings.default_categories.clone()
            }
        }
    }
}

pub struct ExtractionInput {
    transcript: String,
    metadata: TaskMetadata,
    missing: Vec<&'static str>,
    has_been_summarized: bool,
    categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Nothing to extract; no model call was made.
    Skipped,
    /// The model reply was merged into the metadata.
    Extracted,
    /// The model reply was not usable; prior values kept.
    Unparsed,
}

pub struct Extraction {
    pub metadata: TaskMetadata,
    pub source: ExtractionSource,
}

impl Node<SharedState> for ExtractionNode {
    type Prep = ExtractionInput;
    type Exec = Extraction;

    fn name(&self) -> &'static str {
        "extraction"
    }

    fn prepare<'a>(&'a self, state: &'a SharedState) -> BoxFuture<'a, Result<ExtractionInput>> {
        Box::pin(async move {
            let metadata = state.metadata();
            let missing = missing_fields(&metadata, self.threshold());
            let needs_model = !missing.is_empty() && !state.has_been_summarized;
            let categories = if needs_model {
                self.categories().await
            } else {
                vec![]
            };
            debug!(?missing, summarized = state.has_been_summarized, "Extraction input");

            Ok(ExtractionInput {
                transcript: transcript(state.history()),
                metadata,
                missing,
                has_been_summarized: state.has_been_summarized,
                categories,
            })
        })
    }

    fn execute<'a>(&'a self, prep: &'a ExtractionInput) -> BoxFuture<'a, Result<Extraction>> {
        Box::pin(async move {
            if prep.missing.is_empty() || prep.has_been_summarized {
                return Ok(Extraction {
                    metadata: prep.metadata.clone(),
                    source: ExtractionSource::Skipped,
                });
            }

            let prompt = extraction_prompt(&prep.transcript, &prep.categories);
            let reply = self
                .services
                .llm
                .complete(&self.services.model, vec![ChatMessage::user(prompt)])
                .await?;

            match parse_extraction(&reply) {
                Some(fields) => Ok(Extraction {
                    metadata: merge_fields(&prep.metadata, &fields),
                    source: ExtractionSource::Extracted,
                }),
                None => {
                    warn!(reply = %reply, "Extraction reply was not a JSON object, keeping prior fields");
                    Ok(Extraction {
                        metadata: prep.metadata.clone(),
                        source: ExtractionSource::Unparsed,
                    })
                }
            }
        })
    }

    fn finalize(
        &self,
        state: &mut SharedState,
        prep: ExtractionInput,
        exec: Extraction,
    ) -> Result<Action> {
        state.task_metadata.replace(exec.metadata.clone());

        let action = if prep.has_been_summarized {
            actions::REJECT
        } else if missing_text_fields(&exec.metadata).is_empty()
            && exec.metadata.complaint_quality > self.threshold()
        {
            actions::SUMMARIZE
        } else {
            actions::CONTINUE
        };

        info!(
            task_id = ?state.task_id,
            action = %action,
            source = ?exec.source,
            quality = exec.metadata.complaint_quality,
            "Extraction decision"
        );
        Ok(action)
    }
}

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok())
        .as_ref()
}

/// Parse the model reply into a JSON object, unwrapping a fenced code block.
pub fn parse_extraction(reply: &str) -> Option<serde_json::Map<String, Value>> {
    let body = fenced_block()
        .and_then(|re| re.captures(reply))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply)
        .trim();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty() && s != "null",
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Bool(b) => *b,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Overlay fields the model actually found onto `prior`.
///
/// Null, empty, zero and the literal string "null" never overwrite.
/// Unknown keys are ignored.
pub fn merge_fields(prior: &TaskMetadata, fields: &serde_json::Map<String, Value>) -> TaskMetadata {
    let mut merged = prior.clone();

    for (key, value) in fields.iter().filter(|(_, v)| present(v)) {
        let text = || match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        match key.as_str() {
            TOPIC => merged.complaint_topic = text(),
            LOCATION => merged.complaint_location = text(),
            SUMMARY => merged.complaint_summary = text(),
            QUALITY => merged.complaint_quality = coerce_quality(value),
            _ => {}
        }
    }

    merged
}

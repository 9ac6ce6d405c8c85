//! External-model fallback classification.
//!
//! The LLM HTTP client lives outside this crate; we only define the
//! [`ModelClient`] boundary trait and the prompt/parse logic around it.
//! Model classification is the one failure category that is recovered
//! locally: any transport or parse problem degrades to `unknown` at a
//! floor confidence instead of propagating to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::router::{ClassificationMethod, QueryType, QueryTypeClassification};
use super::thresholds;

/// One chat message for the external model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Errors from the external model boundary.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model returned malformed JSON: {0}")]
    MalformedResponse(String),
}

/// Boundary trait for the external model client.
///
/// Implementations send the messages and return the raw completion text;
/// when asked for JSON the model is expected to return a JSON object,
/// but malformed output is a recoverable condition here, never a panic.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ModelError>;
}

/// The compact verdict the model is instructed to return.
#[derive(Debug, Deserialize)]
struct ModelVerdict {
    #[serde(rename = "queryType")]
    query_type: String,
    confidence: f64,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
}

const INSTRUCTION: &str = "You classify analytics questions into exactly one query type.\n\
Types: kpi_single (one overall number), kpi_grouped (numbers broken down by a category), \
trend_time (change over time), distribution (share/proportion of a whole), \
topn (ranking, best/worst N), comparison (two periods or groups against each other), \
unknown (none of the above).\n\
Respond with ONLY a JSON object: {\"queryType\": \"...\", \"confidence\": 0.0-1.0, \"reasoning\": \"...\"}";

/// Classify via the external model. Never fails: every error path
/// degrades to `unknown` at the floor confidence so the caller can fall
/// back to the keyword result.
pub async fn classify_by_model(
    client: &dyn ModelClient,
    input: &str,
    schema_digest: Option<&str>,
) -> QueryTypeClassification {
    let mut prompt = format!("Question: {}", input);
    if let Some(digest) = schema_digest {
        let head: String = digest.chars().take(thresholds::MODEL_DIGEST_CHARS).collect();
        prompt.push_str("\n\nTable configuration:\n");
        prompt.push_str(&head);
    }

    let messages = [ChatMessage::system(INSTRUCTION), ChatMessage::user(prompt)];

    let text = match client
        .chat(
            &messages,
            thresholds::MODEL_TEMPERATURE,
            thresholds::MODEL_MAX_TOKENS,
        )
        .await
    {
        Ok(text) => text,
        Err(err) => {
            debug!(error = %err, "model classification failed, degrading to unknown");
            return QueryTypeClassification::unknown(
                ClassificationMethod::Model,
                thresholds::MODEL_FAILURE_CONFIDENCE,
            );
        }
    };

    match parse_verdict(&text) {
        Some(verdict) => QueryTypeClassification {
            query_type: QueryType::parse_lenient(&verdict.query_type),
            confidence: verdict.confidence.clamp(0.0, 1.0),
            matched_keywords: vec![],
            method: ClassificationMethod::Model,
            top_n: None,
        },
        None => {
            debug!("model returned unparseable classification payload");
            QueryTypeClassification::unknown(
                ClassificationMethod::Model,
                thresholds::MODEL_FAILURE_CONFIDENCE,
            )
        }
    }
}

/// Extract the JSON object from the completion, tolerating markdown
/// fences and prose around it.
fn parse_verdict(text: &str) -> Option<ModelVerdict> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

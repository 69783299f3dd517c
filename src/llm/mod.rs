//! The external text-completion boundary. Everything here treats the
//! model as an opaque, possibly-failing, possibly-malformed text
//! generator: responses are parsed defensively and failures are values
//! (`AiOutcome`), never unwinding, so the deterministic fallback paths
//! key off them directly.

pub mod analyzer;
pub mod classifier;
pub mod prompts;

#[cfg(feature = "gemini")]
pub mod gemini;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// One logical completion call: system instruction, user prompt, an
/// optional response schema and a near-deterministic temperature.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub response_schema: Option<serde_json::Value>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            response_schema: None,
            temperature: 0.1,
        }
    }

    pub fn with_schema(mut self, schema: Option<serde_json::Value>) -> Self {
        self.response_schema = schema;
        self
    }
}

/// Expected failure modes of the completion service. These are data,
/// not errors: every caller recovers locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiFailure {
    #[error("completion service failure: {0}")]
    Service(String),

    #[error("AI response unparseable: {0}")]
    Unparseable(String),
}

pub type AiOutcome = std::result::Result<String, AiFailure>;

/// The one operation the core needs from a hosted model. Invoked at
/// most twice per document; retries, if wanted, belong to the caller.
#[allow(async_fn_in_trait)]
pub trait CompletionService {
    async fn complete(&self, request: &CompletionRequest) -> AiOutcome;
}

/// Two-attempt defensive parse: direct JSON first, then once more after
/// stripping markdown fences and leading/trailing prose.
pub(crate) fn parse_json_response<T: DeserializeOwned>(
    raw: &str,
) -> std::result::Result<T, AiFailure> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first) => {
            let cleaned = clean_json_output(raw);
            serde_json::from_str(&cleaned).map_err(|_| AiFailure::Unparseable(first.to_string()))
        }
    }
}

fn clean_json_output(raw: &str) -> String {
    let mut trimmed = raw.trim();
    if let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim();

    // Whichever JSON delimiter appears first wins; slice to its match.
    let object = trimmed.find('{');
    let array = trimmed.find('[');
    let (open, close) = match (object, array) {
        (Some(o), Some(a)) if a < o => (a, trimmed.rfind(']')),
        (Some(o), _) => (o, trimmed.rfind('}')),
        (None, Some(a)) => (a, trimmed.rfind(']')),
        (None, None) => return trimmed.to_string(),
    };
    match close {
        Some(close) if close > open => trimmed[open..=close].to_string(),
        _ => trimmed.to_string(),
    }
}

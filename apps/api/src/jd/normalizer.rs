//! Turns raw model text into the JSON value returned to callers.
//!
//! Fence stripping is deliberately blind: a leading "```json" (or "```") and a
//! trailing "```" are removed only when they sit at the very ends of the trimmed
//! text. Fences anywhere else are left alone and will fail to parse.

use serde_json::error::Category;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid JSON response: {0}")]
    InvalidJson(serde_json::Error),

    #[error("response processing error: {0}")]
    Processing(String),
}

impl From<serde_json::Error> for NormalizeError {
    /// Malformed or truncated text is a decode failure; anything else the
    /// parser reports (I/O, data errors) is a processing failure.
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Syntax | Category::Eof => NormalizeError::InvalidJson(err),
            Category::Io | Category::Data => NormalizeError::Processing(err.to_string()),
        }
    }
}

/// Strips end-anchored Markdown fences and parses the rest as JSON.
/// Only syntax is checked: objects, arrays and scalars all pass, and
/// missing or empty fields are fine.
pub fn normalize(raw: &str) -> Result<Value, NormalizeError> {
    let cleaned = strip_json_fences(raw);
    Ok(serde_json::from_str(cleaned)?)
}

fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text)
}

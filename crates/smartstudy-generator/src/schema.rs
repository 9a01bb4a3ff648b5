//! Structured-output schemas passed to the model runtime

use serde_json::{json, Value};

/// Which output contract to constrain generation with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// `{ "summary": string }`
    Summary,
    /// Array of quiz items
    Quiz,
    /// Array of flashcards
    Flashcards,
}

impl SchemaKind {
    /// The JSON schema for this kind
    pub fn schema(&self) -> Value {
        match self {
            SchemaKind::Summary => summary_schema(),
            SchemaKind::Quiz => quiz_schema(),
            SchemaKind::Flashcards => flashcard_schema(),
        }
    }
}

/// Object with one required summary string of 50-1600 characters
pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "required": ["summary"],
        "additionalProperties": false,
        "properties": {
            "summary": { "type": "string", "minLength": 50, "maxLength": 1600 }
        }
    })
}

/// 1-20 questions, each with exactly four options
pub fn quiz_schema() -> Value {
    json!({
        "type": "array",
        "minItems": 1,
        "maxItems": 20,
        "items": {
            "type": "object",
            "required": ["question", "options", "answer"],
            "additionalProperties": false,
            "properties": {
                "question": { "type": "string", "minLength": 8 },
                "options": {
                    "type": "array",
                    "minItems": 4,
                    "maxItems": 4,
                    "items": { "type": "string", "minLength": 1 }
                },
                "answer": { "type": "string", "minLength": 1 },
                "explanation": { "type": "string" }
            }
        }
    })
}

/// 1-20 question/answer cards with optional tags
pub fn flashcard_schema() -> Value {
    json!({
        "type": "array",
        "minItems": 1,
        "maxItems": 20,
        "items": {
            "type": "object",
            "required": ["question", "answer"],
            "properties": {
                "question": { "type": "string", "minLength": 6 },
                "answer": { "type": "string", "minLength": 10 },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }
    })
}

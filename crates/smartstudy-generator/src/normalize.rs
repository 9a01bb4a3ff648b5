//! Coerce raw model output into canonical study items
//!
//! Nothing here fails: malformed input degrades to empty output. Accepted
//! key spellings live in ordered tables, probed first to last.

use serde_json::{Map, Value};
use smartstudy_domain::material::QUIZ_OPTION_COUNT;
use smartstudy_domain::{Flashcard, QuizItem};

/// Default word cap for summaries
pub const SUMMARY_WORD_LIMIT: usize = 200;

/// Wrapper keys that may hold a quiz array
pub const QUIZ_WRAPPER_KEYS: &[&str] = &["quiz", "questions", "items", "data"];

/// Wrapper keys that may hold a flashcard array
pub const FLASHCARD_WRAPPER_KEYS: &[&str] = &["flashcards", "cards", "items", "data", "set"];

/// Keys that may hold the summary text
pub const SUMMARY_KEYS: &[&str] = &["summary", "result", "content", "text", "value"];

/// Keys that may hold a flashcard's question
pub const QUESTION_KEYS: &[&str] = &["question", "prompt", "front", "frontText", "q", "term"];

/// Keys that may hold a flashcard's answer
pub const ANSWER_KEYS: &[&str] = &["answer", "response", "back", "backText", "a", "definition"];

/// Collapse whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the item sequence inside an arbitrary payload
///
/// Arrays are returned as-is. Strings are parsed as JSON and unwrapped
/// again. Objects are probed with `wrapper_keys` in order, and the first
/// non-empty result wins; failing that, integer-keyed entries are returned
/// ordered by key. Anything else is empty.
pub fn unwrap_payload(value: &Value, wrapper_keys: &[&str]) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map(|parsed| unwrap_payload(&parsed, wrapper_keys))
            .unwrap_or_default(),
        Value::Object(map) => {
            for key in wrapper_keys {
                if let Some(inner) = map.get(*key) {
                    let items = unwrap_payload(inner, wrapper_keys);
                    if !items.is_empty() {
                        return items;
                    }
                }
            }
            numbered_values(map)
        }
        _ => Vec::new(),
    }
}

/// Values of decimal-integer keys, in numeric key order
fn numbered_values(map: &Map<String, Value>) -> Vec<Value> {
    let mut numbered: Vec<(&str, &Value)> = map
        .iter()
        .filter(|(key, _)| !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()))
        .map(|(key, value)| (key.as_str(), value))
        .collect();

    numbered.sort_by(|(a, _), (b, _)| {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    });
    numbered.into_iter().map(|(_, value)| value.clone()).collect()
}

/// Keep well-formed quiz items, in order
pub fn normalize_quiz_items(value: &Value) -> Vec<QuizItem> {
    unwrap_payload(value, QUIZ_WRAPPER_KEYS)
        .iter()
        .filter_map(normalize_quiz_item)
        .collect()
}

fn normalize_quiz_item(value: &Value) -> Option<QuizItem> {
    let item = value.as_object()?;

    let question = string_field(item, "question");
    let answer = string_field(item, "answer");
    let explanation = string_field(item, "explanation");
    let options: Vec<String> = item
        .get("options")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(Value::as_str)
                .map(normalize_whitespace)
                .collect()
        })
        .unwrap_or_default();

    if question.is_empty() || answer.is_empty() || options.len() != QUIZ_OPTION_COUNT {
        return None;
    }

    Some(QuizItem {
        question,
        options,
        answer,
        explanation,
    })
}

/// Keep flashcards with a resolvable question and answer, in order
pub fn normalize_flashcards(value: &Value) -> Vec<Flashcard> {
    unwrap_payload(value, FLASHCARD_WRAPPER_KEYS)
        .iter()
        .filter_map(normalize_flashcard)
        .collect()
}

fn normalize_flashcard(value: &Value) -> Option<Flashcard> {
    let item = value.as_object()?;
    let question = first_alias(item, QUESTION_KEYS)?;
    let answer = first_alias(item, ANSWER_KEYS)?;
    let tags = item
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(normalize_whitespace)
                .filter(|tag| !tag.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(Flashcard {
        question,
        answer,
        tags,
    })
}

/// First alias holding a string that survives normalization
fn first_alias(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .map(normalize_whitespace)
        .find(|text| !text.is_empty())
}

fn string_field(item: &Map<String, Value>, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .map(normalize_whitespace)
        .unwrap_or_default()
}

/// Extract summary text, capped at [`SUMMARY_WORD_LIMIT`] words
pub fn normalize_summary(value: &Value) -> String {
    normalize_summary_with_limit(value, SUMMARY_WORD_LIMIT)
}

/// Extract summary text, capped at `word_limit` words
///
/// Accepts a bare string or an object carrying one under a known key.
/// Returns an empty string when nothing usable is found.
pub fn normalize_summary_with_limit(value: &Value, word_limit: usize) -> String {
    let text = match value {
        Value::String(text) => text.as_str(),
        Value::Object(map) => SUMMARY_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or(""),
        _ => "",
    };

    text.split_whitespace()
        .take(word_limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to the first `desired_count` items; `None` keeps everything
pub fn enforce_item_count<T>(mut items: Vec<T>, desired_count: Option<u32>) -> Vec<T> {
    if let Some(count) = desired_count {
        items.truncate(count as usize);
    }
    items
}

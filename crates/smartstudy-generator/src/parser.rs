//! Parse raw model output into JSON or flashcards

use crate::normalize::{normalize_flashcards, normalize_whitespace};
use serde_json::Value;
use smartstudy_domain::Flashcard;
use tracing::warn;

/// Parse a response as JSON, tolerating a markdown code fence
///
/// Returns `None` (and logs) when neither the text nor a fenced block in it
/// is valid JSON.
pub fn safe_json_parse(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    // LLMs sometimes wrap JSON in markdown code blocks
    if let Some(value) = extract_json(trimmed).and_then(|inner| serde_json::from_str::<Value>(inner).ok()) {
        return Some(value);
    }

    warn!(
        "Failed to parse JSON response ({} chars); passing raw text through",
        response.len()
    );
    None
}

/// Parse a response for normalization
///
/// Unparseable text becomes a JSON string so normalizers still see it.
pub fn parse_response(response: &str) -> Value {
    safe_json_parse(response).unwrap_or_else(|| Value::String(response.to_string()))
}

/// Extract the body of the first markdown code block
fn extract_json(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after_fence = &response[open + 3..];
    // Skip the language tag line (```json)
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let body_end = body.find("```").unwrap_or(body.len());
    Some(body[..body_end].trim())
}

/// Recover flashcards from unconstrained text
///
/// Tries the outermost `[...]` span as JSON first. Otherwise each
/// blank-line-separated block becomes one card: from `Question:`/`Q:`/`Front:`
/// and `Answer:`/`A:`/`Back:` labels (any case, `:` or `-`), or else from a
/// first line and the remaining lines.
pub fn parse_flashcards_from_text(text: &str) -> Vec<Flashcard> {
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                let cards = normalize_flashcards(&value);
                if !cards.is_empty() {
                    return cards;
                }
            }
        }
    }

    text_blocks(text)
        .iter()
        .filter_map(|block| parse_block(block))
        .filter(Flashcard::is_valid)
        .collect()
}

/// Split into blocks of non-blank lines
fn text_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_block(lines: &[&str]) -> Option<Flashcard> {
    if let Some(card) = labeled_card(lines) {
        return Some(card);
    }

    if lines.len() >= 2 {
        return Some(Flashcard::new(
            normalize_whitespace(lines[0]),
            normalize_whitespace(&lines[1..].join(" ")),
        ));
    }
    None
}

fn labeled_card(lines: &[&str]) -> Option<Flashcard> {
    let question = labeled_value(lines, QUESTION_LABELS)?;

    // "Q: ... A: ..." on a single line
    if let Some((question, answer)) = split_inline(question, ANSWER_LABELS) {
        return Some(Flashcard::new(normalize_whitespace(question), normalize_whitespace(answer)));
    }

    let answer = labeled_value(lines, ANSWER_LABELS)?;
    Some(Flashcard::new(normalize_whitespace(question), normalize_whitespace(answer)))
}

// Longer labels first so "Question" is not read as "Q" + "uestion"
const QUESTION_LABELS: &[&str] = &["question", "front", "q"];
const ANSWER_LABELS: &[&str] = &["answer", "back", "a"];
const ALL_LABELS: &[&str] = &["question", "answer", "front", "back", "q", "a"];

/// Text for the first line carrying one of `labels`
///
/// A label alone on its line takes the following line as its text.
fn labeled_value<'a>(lines: &[&'a str], labels: &[&str]) -> Option<&'a str> {
    lines.iter().enumerate().find_map(|(i, line)| {
        let rest = labeled(line, labels)?;
        if !rest.is_empty() {
            return Some(rest);
        }
        let next = lines.get(i + 1)?;
        labeled(next, ALL_LABELS).is_none().then_some(*next)
    })
}

/// Text after a `Label:` or `Label -` prefix; empty when nothing follows
fn labeled<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    // Tolerate list markers such as "1." or "-" before the label
    let line = line.trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')' | '#' | ' '));

    labels.iter().find_map(|label| {
        let head = line.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        let rest = line[label.len()..].trim_start();
        let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('-'))?;
        Some(rest.trim())
    })
}

/// Split `text` at the first whitespace-preceded `Label:` from `labels`
fn split_inline<'a>(text: &'a str, labels: &[&str]) -> Option<(&'a str, &'a str)> {
    text.char_indices()
        .filter(|&(pos, _)| pos > 0 && text[..pos].ends_with(char::is_whitespace))
        .find_map(|(pos, _)| {
            let tail = &text[pos..];
            labels.iter().find_map(|label| {
                let head = tail.get(..label.len())?;
                if !head.eq_ignore_ascii_case(label) {
                    return None;
                }
                let answer = tail[label.len()..].trim_start().strip_prefix(':')?.trim();
                let question = text[..pos].trim();
                (!question.is_empty() && !answer.is_empty()).then_some((question, answer))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_parse_plain_json() {
        assert_eq!(safe_json_parse(r#" {"key": "value"} "#), Some(json!({"key": "value"})));
    }

    #[test]
    fn test_safe_parse_markdown_fence() {
        let response = "```json\n[{\"question\": \"Q\"}]\n```";
        assert_eq!(safe_json_parse(response), Some(json!([{"question": "Q"}])));
    }

    #[test]
    fn test_safe_parse_fence_without_language() {
        let response = "Here you go:\n```\n{\"summary\": \"text\"}\n```\nEnjoy!";
        assert_eq!(safe_json_parse(response), Some(json!({"summary": "text"})));
    }

    #[test]
    fn test_safe_parse_invalid() {
        assert_eq!(safe_json_parse("This is not JSON"), None);
        assert_eq!(safe_json_parse("```\nnot json\n```"), None);
    }

    #[test]
    fn test_parse_response_passes_raw_text() {
        assert_eq!(parse_response("plain words"), Value::String("plain words".to_string()));
        assert_eq!(parse_response("[1]"), json!([1]));
    }

    #[test]
    fn test_parse_labeled_blocks() {
        let text = "Question: What is X?\nAnswer: X is Y.\n\nQuestion: What is Z?\nAnswer: Z is W.";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "What is X?");
        assert_eq!(cards[0].answer, "X is Y.");
        assert_eq!(cards[1].question, "What is Z?");
        assert_eq!(cards[1].answer, "Z is W.");
    }

    #[test]
    fn test_parse_labels_on_their_own_lines() {
        let text = "Question:\nWhat is photosynthesis?\nAnswer:\nConverting light into chemical energy.";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(
            cards,
            vec![Flashcard::new("What is photosynthesis?", "Converting light into chemical energy.")]
        );
    }

    #[test]
    fn test_parse_pair_on_one_line() {
        let text = "Question: What is X? Answer: X is Y.\n\nQ: What is Z? A: Z is W.";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(
            cards,
            vec![Flashcard::new("What is X?", "X is Y."), Flashcard::new("What is Z?", "Z is W.")]
        );
    }

    #[test]
    fn test_inline_split_needs_colon_after_word_boundary() {
        let text = "Q: What is a catalyst?\nA: A substance that speeds up a reaction.";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(
            cards,
            vec![Flashcard::new("What is a catalyst?", "A substance that speeds up a reaction.")]
        );
    }

    #[test]
    fn test_parse_short_and_dashed_labels() {
        let text = "q - Define entropy\na: A measure of disorder\n\nFRONT: Enthalpy\nBACK - Heat content";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "Define entropy");
        assert_eq!(cards[1].answer, "Heat content");
    }

    #[test]
    fn test_parse_numbered_labels() {
        let text = "1. Question: What is a cell?\n   Answer: The unit of life.";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(cards, vec![Flashcard::new("What is a cell?", "The unit of life.")]);
    }

    #[test]
    fn test_parse_unlabeled_blocks() {
        let text = "Photosynthesis\nConverts light\ninto chemical energy\n\nLonely line";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(cards, vec![Flashcard::new("Photosynthesis", "Converts light into chemical energy")]);
    }

    #[test]
    fn test_parse_embedded_json_array() {
        let text = "Sure! Here are cards: [{\"front\": \"Term\", \"back\": \"Meaning\"}] Hope it helps.";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(cards, vec![Flashcard::new("Term", "Meaning")]);
    }

    #[test]
    fn test_parse_bad_json_falls_back_to_blocks() {
        let text = "[broken\nQuestion: Still parsed?\nAnswer: Yes]";
        let cards = parse_flashcards_from_text(text);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "Still parsed?");
        assert_eq!(cards[0].answer, "Yes]");
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_flashcards_from_text("").is_empty());
        assert!(parse_flashcards_from_text("\n\n\n").is_empty());
    }
}

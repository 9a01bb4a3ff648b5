//! Extractive context: leading sentences, key terms and a preview excerpt

use crate::config::GeneratorConfig;
use crate::types::DocumentContext;
use std::collections::HashMap;

/// Placeholder summary for documents without text
pub const EMPTY_TEXT_SUMMARY: &str = "No textual content extracted.";

/// Words never counted as key terms
pub const STOP_WORDS: [&str; 34] = [
    "the", "a", "an", "and", "or", "is", "are", "was", "were", "be", "to", "of", "in", "for",
    "on", "with", "as", "that", "this", "it", "by", "from", "at", "about", "into", "over",
    "after", "than", "because", "through", "during", "before", "under", "around",
];

/// Build the prompt context using the default limits
pub fn build_context(text: &str, chunks: &[String], page_count: usize) -> DocumentContext {
    build_context_with(&GeneratorConfig::default(), text, chunks, page_count)
}

/// Build the prompt context using configured limits
pub fn build_context_with(
    config: &GeneratorConfig,
    text: &str,
    chunks: &[String],
    page_count: usize,
) -> DocumentContext {
    let preview_text = chunks
        .iter()
        .take(config.preview_chunk_count)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");

    DocumentContext {
        summary_excerpt: summarize_text(text, config.summary_sentence_limit),
        key_terms: extract_key_terms(text, config.key_term_limit),
        preview_text,
        chunk_count: chunks.len(),
        page_count,
    }
}

/// Join the first `limit` sentences of `text`
///
/// A sentence is a run of text ending in one or more of `.`, `!`, `?`.
/// Unterminated trailing text is dropped unless the text has no terminated
/// sentence at all, in which case the whole text is used.
pub fn summarize_text(text: &str, limit: usize) -> String {
    if text.is_empty() {
        return EMPTY_TEXT_SUMMARY.to_string();
    }

    let collapsed = collapse_whitespace_runs(text);
    let mut sentences = split_sentences(&collapsed);
    if sentences.is_empty() {
        sentences.push(collapsed.as_str());
    }

    sentences
        .into_iter()
        .take(limit)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rank the document's distinctive words by frequency
///
/// Ties keep the order in which the words first appeared.
pub fn extract_key_terms(text: &str, limit: usize) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in cleaned.split_whitespace() {
        if token.len() <= 3 || STOP_WORDS.contains(&token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // sort_by is stable, so first-seen order breaks ties
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(limit).map(str::to_string).collect()
}

/// Replace each whitespace run with one space, without trimming
fn collapse_whitespace_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_terminal(c) {
            start.get_or_insert(idx);
            continue;
        }
        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        // Punctuation with no preceding text is not a sentence
        if let Some(begin) = start.take() {
            sentences.push(&text[begin..end]);
        }
    }

    sentences
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

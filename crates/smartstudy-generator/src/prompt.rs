//! Prompt templates for summary, quiz and flashcard generation

use crate::config::clamp_item_count;
use crate::types::DocumentContext;
use smartstudy_domain::DocumentMeta;

/// Clamp a requested count into [1, 20]
pub fn normalize_desired_count(value: Option<i64>) -> Option<u32> {
    value.map(clamp_item_count)
}

/// Parse a textual count, reading its leading integer
///
/// `"12"` and `"12 cards"` both give 12; text without a leading integer is
/// treated as absent.
pub fn parse_desired_count(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long digit strings; they clamp to 20 anyway
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    normalize_desired_count(Some(if negative { -magnitude } else { magnitude }))
}

/// Builds prompts for one document
pub struct PromptBuilder<'a> {
    meta: &'a DocumentMeta,
    context: &'a DocumentContext,
    desired_count: Option<u32>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(meta: &'a DocumentMeta, context: &'a DocumentContext) -> Self {
        Self {
            meta,
            context,
            desired_count: None,
        }
    }

    /// Ask for a specific number of items
    pub fn with_desired_count(mut self, desired_count: Option<u32>) -> Self {
        self.desired_count = normalize_desired_count(desired_count.map(i64::from));
        self
    }

    /// Build the summary prompt
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "You are an experienced educator summarizing a document for study preparation.".to_string(),
        ];
        lines.extend(self.header("Chunks analyzed"));
        lines.push(String::new());
        lines.push(
            "Write a cohesive summary under 200 words that captures the central ideas, goals, and supporting evidence from the material."
                .to_string(),
        );
        lines.push(
            "Prioritize clarity over detail, avoid bullet points, and keep the tone neutral and informative."
                .to_string(),
        );
        lines.extend(self.footer());
        lines.join("\n")
    }

    /// Build the quiz prompt
    pub fn quiz(&self) -> String {
        let directive = match self.desired_count {
            Some(count) => format!(
                "Create exactly {} multiple-choice {} that assess important facts and reasoning.",
                count,
                if count == 1 { "question" } else { "questions" }
            ),
            None => "Create 6 to 8 multiple-choice questions that assess important facts and reasoning."
                .to_string(),
        };

        let mut lines = vec![
            "You are a skilled instructional designer generating high-quality multiple choice questions based on a document."
                .to_string(),
        ];
        lines.extend(self.header("Extracted chunks"));
        lines.push(format!("Summary:\n{}", self.context.summary_excerpt));
        lines.push(String::new());
        lines.push(directive);
        lines.extend(QUIZ_RULES.iter().map(|rule| rule.to_string()));
        lines.extend(self.footer());
        lines.join("\n")
    }

    /// Build the flashcard prompt
    pub fn flashcards(&self) -> String {
        let directive = match self.desired_count {
            Some(count) => format!(
                "Create exactly {} {}. {}",
                count,
                if count == 1 { "flashcard" } else { "flashcards" },
                FLASHCARD_PAIRING
            ),
            None => format!("Create between 8 and 12 flashcards. {}", FLASHCARD_PAIRING),
        };

        let mut lines = vec!["You are an expert tutor extracting flashcards from study material.".to_string()];
        lines.extend(self.header("Chunks analyzed"));
        lines.push(format!("Summary:\n{}", self.context.summary_excerpt));
        lines.push(String::new());
        lines.push(directive);
        lines.push(
            "Prefer conceptual prompts (\"What is...\", \"How does...\") and avoid yes/no questions. Keep the output strictly in JSON format."
                .to_string(),
        );
        lines.push("Keep answers under 80 words and focus on clarity.".to_string());
        lines.extend(self.footer());
        lines.join("\n")
    }

    /// Build the unconstrained flashcard retry prompt
    pub fn relaxed_flashcards(&self) -> String {
        format!("{}\n\n{}", self.flashcards(), RELAXED_FLASHCARD_REQUEST)
    }

    fn header(&self, chunk_label: &str) -> Vec<String> {
        vec![
            format!("Document title: {}", self.meta.title()),
            format!(
                "Pages: {}, {}: {}",
                self.context.page_count, chunk_label, self.context.chunk_count
            ),
            format!("Key topics: {}", self.context.key_terms.join(", ")),
        ]
    }

    fn footer(&self) -> Vec<String> {
        vec![
            String::new(),
            "Return only JSON matching the provided schema.".to_string(),
            String::new(),
            "Reference material you can cite:".to_string(),
            self.context.preview_text.clone(),
        ]
    }
}

/// Build the summary prompt
pub fn summary_prompt(meta: &DocumentMeta, context: &DocumentContext) -> String {
    PromptBuilder::new(meta, context).summary()
}

/// Build the quiz prompt
pub fn quiz_prompt(meta: &DocumentMeta, context: &DocumentContext, desired_count: Option<u32>) -> String {
    PromptBuilder::new(meta, context)
        .with_desired_count(desired_count)
        .quiz()
}

/// Build the flashcard prompt
pub fn flashcard_prompt(
    meta: &DocumentMeta,
    context: &DocumentContext,
    desired_count: Option<u32>,
) -> String {
    PromptBuilder::new(meta, context)
        .with_desired_count(desired_count)
        .flashcards()
}

/// Build the relaxed flashcard retry prompt
pub fn relaxed_flashcard_prompt(
    meta: &DocumentMeta,
    context: &DocumentContext,
    desired_count: Option<u32>,
) -> String {
    PromptBuilder::new(meta, context)
        .with_desired_count(desired_count)
        .relaxed_flashcards()
}

const QUIZ_RULES: [&str; 6] = [
    "Rules:",
    "- Each question must have exactly four options.",
    "- Only one option should be correct.",
    "- Do not include phrases like \"Option A\" or \"All of the above\".",
    "- Provide a short explanation for the correct answer (<= 2 sentences).",
    "- Avoid repeating questions or using identical wording.",
];

const FLASHCARD_PAIRING: &str =
    "Each card should pair a concise question with a detailed answer that reinforces understanding.";

const RELAXED_FLASHCARD_REQUEST: &str = "Respond with a JSON array named flashcards, where each item has \"question\" and \"answer\" fields. If you cannot produce the requested amount, return as many unique items as possible without duplicating content.";

//! Generated study material - quiz items and flashcards

use serde::{Deserialize, Serialize};

/// Number of options every quiz item must carry
pub const QUIZ_OPTION_COUNT: usize = 4;

/// A multiple-choice question
///
/// Valid items have a non-empty question, exactly four options, and a
/// non-empty answer. Invalid items are discarded by the normalizer, never
/// repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    /// The question text
    pub question: String,

    /// Exactly four answer options
    pub options: Vec<String>,

    /// The correct answer; matches one option case-insensitively
    pub answer: String,

    /// Short explanation of the correct answer (may be empty)
    #[serde(default)]
    pub explanation: String,
}

impl QuizItem {
    /// Whether the item satisfies the shape invariants
    pub fn is_valid(&self) -> bool {
        !self.question.is_empty()
            && self.options.len() == QUIZ_OPTION_COUNT
            && !self.answer.is_empty()
    }

    /// Index of the option matching the answer, compared case-insensitively
    pub fn answer_index(&self) -> Option<usize> {
        let answer = self.answer.to_lowercase();
        self.options
            .iter()
            .position(|option| option.to_lowercase() == answer)
    }
}

/// A question/answer study card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Front of the card
    pub question: String,

    /// Back of the card
    pub answer: String,

    /// Optional topic tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Flashcard {
    /// Create a card without tags
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            tags: Vec::new(),
        }
    }

    /// Whether both sides are present
    pub fn is_valid(&self) -> bool {
        !self.question.is_empty() && !self.answer.is_empty()
    }
}

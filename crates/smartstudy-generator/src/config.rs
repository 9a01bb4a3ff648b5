//! Configuration for generation and study preferences

use crate::error::GeneratorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest accepted item count
pub const MIN_ITEM_COUNT: u32 = 1;

/// Largest accepted item count
pub const MAX_ITEM_COUNT: u32 = 20;

/// Clamp an item count into `[MIN_ITEM_COUNT, MAX_ITEM_COUNT]`
pub fn clamp_item_count(count: i64) -> u32 {
    count.clamp(MIN_ITEM_COUNT as i64, MAX_ITEM_COUNT as i64) as u32
}

/// Tunables for context extraction, chunking and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Sentences kept in the extractive summary
    pub summary_sentence_limit: usize,

    /// Key terms kept per document
    pub key_term_limit: usize,

    /// Chunks joined into the preview text
    pub preview_chunk_count: usize,

    /// Words kept in a normalized summary
    pub summary_word_limit: usize,

    /// Maximum chunk size (bytes)
    pub max_chunk_size: usize,

    /// Quiet period before a scheduled save is written (milliseconds)
    pub persist_debounce_ms: u64,
}

impl GeneratorConfig {
    /// Get the persist debounce as a Duration
    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), GeneratorError> {
        let problem = if self.summary_sentence_limit == 0 {
            "summary_sentence_limit must be greater than 0"
        } else if self.summary_word_limit == 0 {
            "summary_word_limit must be greater than 0"
        } else if self.max_chunk_size < 16 {
            "max_chunk_size must be at least 16"
        } else {
            return Ok(());
        };
        Err(GeneratorError::Config(problem.to_string()))
    }

    /// Load and validate configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, GeneratorError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, GeneratorError> {
        toml::to_string_pretty(self)
            .map_err(|e| GeneratorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            summary_sentence_limit: 6,
            key_term_limit: 12,
            preview_chunk_count: 3,
            summary_word_limit: 200,
            max_chunk_size: 6400,
            persist_debounce_ms: 400,
        }
    }
}

/// How many items a stage should ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMode {
    /// Let the model pick within its default range
    #[default]
    Auto,
    /// Ask for exactly the configured count
    Custom,
}

impl CountMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CountMode::Auto => "auto",
            CountMode::Custom => "custom",
        }
    }
}

/// Count preference for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSetting {
    /// Auto or custom
    #[serde(default)]
    pub mode: CountMode,

    /// Requested count, used in custom mode
    pub count: u32,
}

impl CountSetting {
    /// Create a setting, clamping the count
    pub fn new(mode: CountMode, count: i64) -> Self {
        Self {
            mode,
            count: clamp_item_count(count),
        }
    }

    /// Desired count passed to generation; `None` in auto mode
    pub fn target(&self) -> Option<u32> {
        match self.mode {
            CountMode::Auto => None,
            CountMode::Custom => Some(clamp_item_count(self.count as i64)),
        }
    }
}

/// Per-stage item count preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudySettings {
    /// Quiz question count
    pub quiz: CountSetting,

    /// Flashcard count
    pub flashcard: CountSetting,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            quiz: CountSetting::new(CountMode::Auto, 6),
            flashcard: CountSetting::new(CountMode::Auto, 10),
        }
    }
}

impl StudySettings {
    /// Desired quiz count, if custom
    pub fn quiz_target(&self) -> Option<u32> {
        self.quiz.target()
    }

    /// Desired flashcard count, if custom
    pub fn flashcard_target(&self) -> Option<u32> {
        self.flashcard.target()
    }

    /// Re-clamp counts that arrived from an untrusted source
    pub fn normalized(mut self) -> Self {
        self.quiz.count = clamp_item_count(self.quiz.count as i64);
        self.flashcard.count = clamp_item_count(self.flashcard.count as i64);
        self
    }
}

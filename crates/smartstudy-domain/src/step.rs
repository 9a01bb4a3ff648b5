//! Step module - per-stage generation status

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three generation stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Document summary (required by the later stages)
    Summary,

    /// Multiple-choice quiz
    Quiz,

    /// Flashcards
    Flashcards,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 3] = [Stage::Summary, Stage::Quiz, Stage::Flashcards];

    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Summary => "summary",
            Stage::Quiz => "quiz",
            Stage::Flashcards => "flashcards",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation status of a single stage
///
/// Transitions: `Idle → Pending → Done | Error`. A cancelled step goes back
/// to `Idle`, never to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    /// Not started, or cancelled
    #[default]
    Idle,

    /// In flight
    Pending,

    /// Finished (possibly with empty results)
    Done,

    /// Failed
    Error,
}

impl StepState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Idle => "idle",
            StepState::Pending => "pending",
            StepState::Done => "done",
            StepState::Error => "error",
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = Stage::ALL.iter().map(Stage::to_string).collect();
        assert_eq!(names, ["summary", "quiz", "flashcards"]);
    }

    #[test]
    fn test_step_state_default_is_idle() {
        assert_eq!(StepState::default(), StepState::Idle);
        assert_eq!(StepState::Error.to_string(), "error");
    }
}

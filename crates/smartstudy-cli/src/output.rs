//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use smartstudy_domain::{StepState, StudySession};
use smartstudy_generator::{GenerationEvent, PipelineEvent, StudySettings};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a list of sessions.
    pub fn format_sessions(&self, sessions: &[StudySession]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<_> = sessions.iter().map(StudySession::to_value).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Table => Ok(self.format_sessions_table(sessions)),
            OutputFormat::Quiet => Ok(sessions
                .iter()
                .filter_map(|s| s.id.clone())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_sessions_table(&self, sessions: &[StudySession]) -> String {
        if sessions.is_empty() {
            return self.colorize("No sessions found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Document", "Pages", "Quiz", "Cards", "Updated"]);

        for session in sessions {
            let id = session.id.as_deref().unwrap_or("");
            let title = session.pdf_meta.as_ref().map(|m| m.title()).unwrap_or("");
            builder.push_record([
                id.get(..12).unwrap_or(id).to_string(), // Truncate hash for readability
                title.to_string(),
                session.page_count.to_string(),
                session.quiz_items.len().to_string(),
                session.flashcards.len().to_string(),
                session.updated_at.map(|t| t.to_string()).unwrap_or_default(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format one session's study material.
    pub fn format_session(&self, session: &StudySession) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&session.to_value())?),
            OutputFormat::Quiet => Ok(session.summary.clone()),
            OutputFormat::Table => Ok(self.format_session_text(session)),
        }
    }

    fn format_session_text(&self, session: &StudySession) -> String {
        let mut out = Vec::new();
        let title = session.pdf_meta.as_ref().map(|m| m.title()).unwrap_or("Untitled PDF");
        out.push(self.colorize(title, "cyan"));
        out.push(format!(
            "{} pages, {} chunks",
            session.page_count, session.chunk_count
        ));

        if !session.has_material() {
            out.push(self.warning("No study material has been generated for this document."));
            return out.join("\n");
        }

        out.push(String::new());
        out.push(self.colorize("Summary", "magenta"));
        if session.summary.is_empty() {
            out.push("(none)".to_string());
        } else {
            out.push(session.summary.clone());
        }

        out.push(String::new());
        out.push(self.colorize(&format!("Quiz ({})", session.quiz_items.len()), "magenta"));
        for (i, item) in session.quiz_items.iter().enumerate() {
            out.push(format!("{}. {}", i + 1, item.question));
            let correct = item.answer_index();
            for (i, (letter, option)) in ['A', 'B', 'C', 'D'].iter().zip(&item.options).enumerate() {
                let line = format!("   {}) {}", letter, option);
                if correct == Some(i) {
                    out.push(self.colorize(&line, "green"));
                } else {
                    out.push(line);
                }
            }
            if !item.explanation.is_empty() {
                out.push(format!("   {}", item.explanation));
            }
        }

        out.push(String::new());
        out.push(self.colorize(&format!("Flashcards ({})", session.flashcards.len()), "magenta"));
        if !session.flashcards.is_empty() {
            let mut builder = Builder::default();
            builder.push_record(["Question", "Answer", "Tags"]);
            for card in &session.flashcards {
                builder.push_record([card.question.clone(), card.answer.clone(), card.tags.join(", ")]);
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            out.push(table.to_string());
        }

        out.join("\n")
    }

    /// Format study count settings.
    pub fn format_settings(&self, settings: &StudySettings) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(settings)?);
        }

        let mut builder = Builder::default();
        builder.push_record(["Stage", "Mode", "Count"]);
        for (stage, setting) in [("quiz", settings.quiz), ("flashcards", settings.flashcard)] {
            builder.push_record([
                stage.to_string(),
                setting.mode.as_str().to_string(),
                setting.count.to_string(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        Ok(table.to_string())
    }

    /// Format a pipeline progress event, or `None` for events not shown.
    pub fn pipeline_event(&self, event: &PipelineEvent) -> Option<String> {
        match event {
            PipelineEvent::Generation(_, GenerationEvent::Status(status)) => Some(self.info(status)),
            PipelineEvent::Generation(_, GenerationEvent::DownloadProgress(percent)) => {
                Some(self.info(&format!("Model download {}%", percent)))
            }
            PipelineEvent::Step(stage, StepState::Error) => {
                Some(self.error(&format!("{} generation failed", stage)))
            }
            PipelineEvent::Step(stage, StepState::Done) => Some(self.success(&format!("{} done", stage))),
            PipelineEvent::Step(..) => None,
            PipelineEvent::Note(note) => Some(self.warning(note)),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

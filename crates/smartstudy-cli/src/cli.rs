//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Smart Study CLI - Turn document text into a summary, quiz and flashcards.
#[derive(Debug, Parser)]
#[command(name = "smart-study")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SMART_STUDY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate study material from an extracted text file
    Generate(GenerateArgs),

    /// Review stored study sessions
    Sessions(SessionsArgs),

    /// Show or change quiz and flashcard counts
    Settings(SettingsArgs),
}

/// Arguments for the generate command.
#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Text file holding the extracted document text
    pub file: PathBuf,

    /// Document name (defaults to the file name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Page count (defaults to form-feed separated pages in the text)
    #[arg(short, long)]
    pub pages: Option<usize>,

    /// Number of quiz questions (1-20) for this run
    #[arg(long)]
    pub quiz_count: Option<i64>,

    /// Number of flashcards (1-20) for this run
    #[arg(long)]
    pub flashcard_count: Option<i64>,

    /// Model name
    #[arg(short, long, env = "SMART_STUDY_MODEL")]
    pub model: Option<String>,

    /// Runtime base URL
    #[arg(short, long, env = "SMART_STUDY_ENDPOINT")]
    pub endpoint: Option<String>,
}

/// Arguments for session review.
#[derive(Debug, Parser)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub action: SessionAction,
}

/// Session review actions.
#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// List stored sessions, most recent first
    List,

    /// Show a session's study material
    Show {
        /// Session id; defaults to the last opened session
        id: Option<String>,
    },

    /// Delete a session
    Delete {
        /// Session id
        id: String,
    },
}

/// Arguments for study settings.
#[derive(Debug, Parser)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

/// Study settings actions.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Show current counts
    Show,

    /// Change counts
    Set {
        /// Quiz count mode
        #[arg(long, value_enum)]
        quiz_mode: Option<ModeArg>,

        /// Quiz count (clamped to 1-20)
        #[arg(long)]
        quiz_count: Option<i64>,

        /// Flashcard count mode
        #[arg(long, value_enum)]
        flashcard_mode: Option<ModeArg>,

        /// Flashcard count (clamped to 1-20)
        #[arg(long)]
        flashcard_count: Option<i64>,
    },
}

/// Count mode argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ModeArg {
    /// Let the model choose
    Auto,
    /// Use the configured count
    Custom,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<ModeArg> for smartstudy_generator::CountMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => smartstudy_generator::CountMode::Auto,
            ModeArg::Custom => smartstudy_generator::CountMode::Custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartstudy_generator::CountMode;

    #[test]
    fn test_generate_command() {
        let cli = Cli::parse_from([
            "smart-study",
            "generate",
            "notes.txt",
            "--quiz-count",
            "5",
            "--model",
            "mistral",
        ]);
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.file, PathBuf::from("notes.txt"));
                assert_eq!(args.quiz_count, Some(5));
                assert_eq!(args.model.as_deref(), Some("mistral"));
                assert!(args.flashcard_count.is_none());
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_sessions_show_defaults_to_last() {
        let cli = Cli::parse_from(["smart-study", "sessions", "show"]);
        match cli.command {
            Command::Sessions(SessionsArgs {
                action: SessionAction::Show { id },
            }) => assert!(id.is_none()),
            _ => panic!("Expected sessions show"),
        }
    }

    #[test]
    fn test_settings_set() {
        let cli = Cli::parse_from([
            "smart-study",
            "--format",
            "json",
            "settings",
            "set",
            "--quiz-mode",
            "custom",
            "--quiz-count",
            "8",
        ]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        match cli.command {
            Command::Settings(SettingsArgs {
                action: SettingsAction::Set { quiz_mode, quiz_count, .. },
            }) => {
                assert!(matches!(quiz_mode, Some(ModeArg::Custom)));
                assert_eq!(quiz_count, Some(8));
            }
            _ => panic!("Expected settings set"),
        }
    }

    #[test]
    fn test_mode_conversion() {
        let mode: CountMode = ModeArg::Custom.into();
        assert_eq!(mode, CountMode::Custom);
    }
}

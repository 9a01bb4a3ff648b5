//! Settings command implementation.

use crate::cli::{ModeArg, SettingsAction, SettingsArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use smartstudy_generator::{CountSetting, StudySettings};
use std::path::Path;

/// Execute the settings command.
pub async fn execute_settings(
    args: SettingsArgs,
    config: &mut Config,
    config_path: &Path,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        SettingsAction::Show => {
            println!("{}", formatter.format_settings(&config.study)?);
        }
        SettingsAction::Set {
            quiz_mode,
            quiz_count,
            flashcard_mode,
            flashcard_count,
        } => {
            config.study = apply(config.study, quiz_mode, quiz_count, flashcard_mode, flashcard_count);
            config.save_to(config_path)?;
            println!("{}", formatter.success("Study settings updated"));
            println!("{}", formatter.format_settings(&config.study)?);
        }
    }
    Ok(())
}

fn apply(
    settings: StudySettings,
    quiz_mode: Option<ModeArg>,
    quiz_count: Option<i64>,
    flashcard_mode: Option<ModeArg>,
    flashcard_count: Option<i64>,
) -> StudySettings {
    StudySettings {
        quiz: update(settings.quiz, quiz_mode, quiz_count),
        flashcard: update(settings.flashcard, flashcard_mode, flashcard_count),
    }
}

fn update(current: CountSetting, mode: Option<ModeArg>, count: Option<i64>) -> CountSetting {
    CountSetting::new(
        mode.map(Into::into).unwrap_or(current.mode),
        count.unwrap_or(i64::from(current.count)),
    )
}

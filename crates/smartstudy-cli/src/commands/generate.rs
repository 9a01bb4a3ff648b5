//! Generate command implementation.

use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use smartstudy_generator::{
    document_meta, CountMode, CountSetting, Generator, PipelineEvent, PipelineOutcome,
    SessionManager, StudyPipeline, StudySettings, StudyUpload,
};
use smartstudy_llm::OllamaRuntime;
use smartstudy_store::{DebouncedPersister, SqliteSessionStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::sync::mpsc;

/// Page separator emitted by common PDF-to-text extractors
const PAGE_BREAK: char = '\u{c}';

/// Execute the generate command.
pub async fn execute_generate(args: GenerateArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let bytes = fs::read(&args.file)?;
    let text = String::from_utf8(bytes.clone())
        .map_err(|_| CliError::InvalidInput(format!("{} is not UTF-8 text", args.file.display())))?;
    if text.trim().is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} contains no text",
            args.file.display()
        )));
    }

    let name = args.name.clone().unwrap_or_else(|| file_name(&args.file));
    let meta = document_meta(&bytes, &name, modified_millis(&args.file), "");
    let pages = args.pages.unwrap_or_else(|| count_pages(&text));
    let settings = run_settings(config.study, args.quiz_count, args.flashcard_count);

    let endpoint = args.endpoint.as_deref().unwrap_or(&config.runtime.endpoint);
    let model = args.model.as_deref().unwrap_or(&config.runtime.model);
    tracing::info!("Using model {} at {}", model, endpoint);
    let runtime = OllamaRuntime::new(endpoint, model).with_max_retries(config.runtime.max_retries);

    let generator = Arc::new(
        Generator::new(SessionManager::with_runtime(Arc::new(runtime)))
            .with_config(config.generator.clone()),
    );

    let database = config.database_path()?;
    if let Some(parent) = database.parent() {
        fs::create_dir_all(parent)?;
    }
    let store = SqliteSessionStore::new(&database)?;
    let persister = Arc::new(DebouncedPersister::new(store, config.generator.persist_debounce()));

    let pipeline = Arc::new(
        StudyPipeline::new(Arc::clone(&generator), persister.clone()).with_settings(settings),
    );

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let printer = {
        let formatter_lines = Formatter::new(crate::config::OutputFormat::Table, config.settings.color);
        tokio::spawn(async move {
            let mut last = None;
            while let Some(event) = events_rx.recv().await {
                if let Some(line) = formatter_lines.pipeline_event(&event) {
                    // Statuses repeat once per streamed fragment
                    if last.as_ref() != Some(&line) {
                        eprintln!("{}", line);
                        last = Some(line);
                    }
                }
            }
        })
    };

    let interrupt = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling generation");
                pipeline.cancel();
            }
        })
    };

    let upload = StudyUpload::new(meta, text, pages);
    let outcome = pipeline.run(upload, Some(&events_tx)).await;

    interrupt.abort();
    drop(events_tx);
    let _ = printer.await;

    generator.sessions().destroy_session().await;
    persister.flush().await;

    match outcome {
        PipelineOutcome::Completed => {
            let session = pipeline.snapshot().await;
            println!("{}", formatter.format_session(&session)?);
            Ok(())
        }
        PipelineOutcome::Cancelled => {
            eprintln!("{}", formatter.warning("Generation cancelled."));
            Ok(())
        }
        PipelineOutcome::Halted => Err(CliError::Halted(
            "the summary could not be generated".to_string(),
        )),
    }
}

/// Apply per-run count overrides on top of the saved settings
fn run_settings(saved: StudySettings, quiz_count: Option<i64>, flashcard_count: Option<i64>) -> StudySettings {
    let mut settings = saved;
    if let Some(count) = quiz_count {
        settings.quiz = CountSetting::new(CountMode::Custom, count);
    }
    if let Some(count) = flashcard_count {
        settings.flashcard = CountSetting::new(CountMode::Custom, count);
    }
    settings
}

/// Pages in extracted text, counting form-feed separators
fn count_pages(text: &str) -> usize {
    text.trim_end_matches(PAGE_BREAK)
        .split(PAGE_BREAK)
        .count()
        .max(1)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn modified_millis(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Smart Study CLI - Generate and review study material from document text.

use clap::Parser;
use smartstudy_cli::commands;
use smartstudy_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing (log to stderr)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> smartstudy_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load config, falling back to defaults
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };
    let mut config = Config::load_from(&config_path)?;

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Generate(args) => {
            commands::execute_generate(args, &config, &formatter).await?;
        }
        Command::Sessions(args) => {
            commands::execute_sessions(args, &config, &formatter).await?;
        }
        Command::Settings(args) => {
            commands::execute_settings(args, &mut config, &config_path, &formatter).await?;
        }
    }

    Ok(())
}

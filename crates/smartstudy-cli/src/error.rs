//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store error
    #[error("Store error: {0}")]
    Store(#[from] smartstudy_store::StoreError),

    /// Generation error
    #[error("Generation error: {0}")]
    Generator(#[from] smartstudy_generator::GeneratorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No session with the given id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The summary failed, so nothing else was generated
    #[error("Study generation halted: {0}")]
    Halted(String),
}

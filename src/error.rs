use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the calendar engine
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Document store error: {0}")]
    #[diagnostic(code(workcal::store))]
    Store(String),

    #[error("External calendar API error: {0}")]
    #[diagnostic(code(workcal::external))]
    External(String),

    #[error("Batch write failed: {0}")]
    #[diagnostic(
        code(workcal::write),
        help("no records from the failed batch were persisted")
    )]
    Write(String),

    #[error("Parse error: {0}")]
    #[diagnostic(code(workcal::parse))]
    Parse(String),

    #[error("Invalid event registration: {0}")]
    #[diagnostic(code(workcal::registration))]
    InvalidRegistration(String),

    #[error("Invalid month {month} in year {year}")]
    #[diagnostic(code(workcal::month))]
    InvalidMonth { year: i32, month: u32 },

    #[error("Record not found: {0}")]
    #[diagnostic(code(workcal::not_found))]
    NotFound(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(workcal::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(workcal::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(workcal::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(workcal::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(workcal::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type EngineResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create document store errors
pub fn store_error(message: &str) -> Error {
    Error::Store(message.to_string())
}

/// Helper to create external API errors
pub fn external_error(message: &str) -> Error {
    Error::External(message.to_string())
}

/// Helper to create batch write errors
pub fn write_error(message: &str) -> Error {
    Error::Write(message.to_string())
}

/// Helper to create parse errors
pub fn parse_error(message: &str) -> Error {
    Error::Parse(message.to_string())
}

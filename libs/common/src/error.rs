use std::path::PathBuf;
use thiserror::Error;

/// Basic library error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration sources did not extract into the target type
    #[error("Configuration error: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// Malformed hex input
    #[error("Parse error: {0}")]
    Parse(String),

    /// Logging subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Error result type
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Extract(Box::new(err))
    }
}

//! Error types for the file boundary.

use thiserror::Error;

/// Result type for file operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or writing reduction files.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A text column could not be read.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// File contents or array layout the format cannot hold.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Error from the array layer, including configuration errors.
    #[error(transparent)]
    Core(#[from] sansred_core::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Core(sansred_core::Error::Config(message.into()))
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

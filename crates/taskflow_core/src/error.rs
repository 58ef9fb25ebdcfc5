use std::fmt;
use std::path::Path;

/// Failure reported by every fallible TaskFlow operation. The CLI prints it as
/// `<code> - <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Rejected user input: blank task text, bad flags, unknown overrides.
    InvalidInput(String),
    /// Stored or configured data that does not parse.
    InvalidData(String),
    /// The store or config file could not be read or written.
    Io(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    /// Filesystem failure tagged with the file it happened on.
    pub fn io_at(path: &Path, err: impl fmt::Display) -> Self {
        Self::Io(format!("{}: {err}", path.display()))
    }

    /// A stored entry whose payload cannot be decoded.
    pub fn corrupt_entry(key: &str, err: impl fmt::Display) -> Self {
        Self::InvalidData(format!("stored entry '{key}' is corrupt: {err}"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message) | Self::InvalidData(message) | Self::Io(message) => {
                message
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}

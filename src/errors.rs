use thiserror::Error;

/// Why a stored document could not be turned back into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed document at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("truncated document: {0}")]
    Truncated(String),
    #[error("schema mismatch at line {line}, column {column}: {message}")]
    SchemaMismatch {
        line: usize,
        column: usize,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("DECODE_FAILED: {0}")]
    Decode(#[from] DecodeError),
    #[error("WRITE_FAILED: {0}")]
    Write(String),
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Prefixes a write failure with what the caller was trying to save.
    pub fn while_saving(self, what: &str) -> Self {
        match self {
            Self::Write(message) | Self::Io(message) => {
                Self::Write(format!("could not save {}: {}", what, message))
            }
            other => other,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

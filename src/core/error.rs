use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Row '{0}' not found")]
    RowNotFound(String),

    #[error("Field '{field}' is not an actuals field of {kind}")]
    UnknownField { kind: String, field: String },

    #[error("Cannot delete {kind} '{id}': {children} child record(s) still reference it")]
    HasChildren {
        kind: String,
        id: String,
        children: usize,
    },

    #[error("Invalid progress update: {0}")]
    InvalidProgress(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request for row '{0}' timed out")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for TrackError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

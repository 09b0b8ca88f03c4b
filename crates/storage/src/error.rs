use thiserror::Error;

/// Report store errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("case report encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("run not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;

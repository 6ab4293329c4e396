use thiserror::Error;

/// Failure taxonomy for store operations.
///
/// `Validation` is always caller-correctable and is reported before any
/// persistence side effect; storage failures propagate unchanged to the
/// transport boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("habit {0} not found")]
    NotFound(i64),

    /// An uploaded snapshot that was refused before the swap.
    #[error("invalid snapshot: {0}")]
    BadSnapshot(String),

    /// A stored row that no longer parses, e.g. after importing a damaged file.
    #[error("corrupt habit row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted while fetching raw question records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("failed to read question file: {0}")]
    Io(#[from] std::io::Error),
    #[error("question request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("question data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question data must be a JSON array")]
    NotAnArray,
}

/// Errors emitted by `QuizSelector`.
///
/// These are contract or data faults and are always surfaced to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz questions have not been loaded")]
    NotLoaded,
    #[error("no quiz question with id {0}")]
    NotFound(String),
    #[error("invalid quiz data: {0}")]
    DataFormat(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors emitted by quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for quiz")]
    Empty,
    #[error("quiz already completed")]
    Completed,
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

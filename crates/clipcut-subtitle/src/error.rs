//! Subtitle error types.

use thiserror::Error;

pub type SubtitleResult<T> = Result<T, SubtitleError>;

#[derive(Debug, Error)]
pub enum SubtitleError {
    /// The file as a whole is not a subtitle file; per-cue problems are
    /// skipped with a warning instead.
    #[error("invalid subtitle file: {0}")]
    InvalidSubtitle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

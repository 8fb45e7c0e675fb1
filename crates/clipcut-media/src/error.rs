//! Media error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found on PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found on PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed (exit code {code:?}): {message}")]
    FfmpegFailed {
        message: String,
        code: Option<i32>,
    },

    #[error("ffmpeg timed out after {0} seconds")]
    Timeout(u64),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] clipcut_models::SrtTimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            code,
        }
    }
}

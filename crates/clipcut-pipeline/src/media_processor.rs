//! Media operations seam.
//!
//! The media stage talks to FFmpeg through this trait so tests can record
//! cut/concat calls without spawning processes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use clipcut_media::{concat_clips, extract_clip, MediaResult};

#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Cut `[start, end]` (SRT timestamps) from `input` into `output`.
    async fn extract(
        &self,
        input: &Path,
        output: &Path,
        start_time: &str,
        end_time: &str,
    ) -> MediaResult<()>;

    /// Concatenate `files` in order into `output`.
    async fn concat(&self, files: &[PathBuf], output: &Path) -> MediaResult<()>;
}

/// Production implementation backed by FFmpeg.
#[derive(Debug, Default, Clone)]
pub struct FfmpegProcessor;

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract(
        &self,
        input: &Path,
        output: &Path,
        start_time: &str,
        end_time: &str,
    ) -> MediaResult<()> {
        extract_clip(input, output, start_time, end_time).await
    }

    async fn concat(&self, files: &[PathBuf], output: &Path) -> MediaResult<()> {
        concat_clips(files, output).await
    }
}

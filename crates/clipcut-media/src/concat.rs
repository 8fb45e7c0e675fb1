//! Demuxer-list concatenation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Concatenate clips, in the given order, into one output file.
///
/// Writes a temporary concat list with absolute paths next to the output,
/// runs the demuxer concat with stream copy, and removes the list on every
/// exit path.
pub async fn concat_clips(files: &[PathBuf], output: impl AsRef<Path>) -> MediaResult<()> {
    let output = output.as_ref();
    if files.is_empty() {
        return Err(MediaError::ffmpeg_failed("no input files to concatenate", None));
    }

    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let list_path = parent.join("concat_list.txt");
    let mut list = String::new();
    for file in files {
        let absolute = std::fs::canonicalize(file)?;
        // Demuxer list syntax: single quotes, embedded quotes escaped
        list.push_str(&format!("file '{}'\n", absolute.display().to_string().replace('\'', "'\\''")));
    }
    std::fs::write(&list_path, &list)?;

    let cmd = FfmpegCommand::new(&list_path, output).concat_input().stream_copy();
    let result = FfmpegRunner::new().run(&cmd).await;

    let _ = std::fs::remove_file(&list_path);

    result?;
    info!(output = %output.display(), inputs = files.len(), "collection concatenated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = concat_clips(&[], dir.path().join("out.mp4")).await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
    }
}

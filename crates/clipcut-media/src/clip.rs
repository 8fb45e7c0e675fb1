//! Stream-copy clip extraction.

use std::path::Path;

use tracing::info;

use clipcut_models::timestamp::{srt_to_ffmpeg, to_seconds};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Cut `[start_time, end_time]` out of the source without re-encoding.
///
/// Times arrive in SRT form (`HH:MM:SS,mmm`) and are converted to FFmpeg dot
/// form. The seek happens before the input for fast keyframe positioning and
/// the window is expressed as a duration rather than an absolute end.
pub async fn extract_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_time: &str,
    end_time: &str,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let start_secs = to_seconds(start_time)?;
    let end_secs = to_seconds(end_time)?;
    let duration = (end_secs - start_secs).max(0.0);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let cmd = FfmpegCommand::new(input, output)
        .seek(srt_to_ffmpeg(start_time))
        .duration(duration)
        .stream_copy()
        .zero_negative_ts();

    FfmpegRunner::new().run(&cmd).await?;

    info!(
        output = %output.display(),
        start = %start_time,
        end = %end_time,
        duration_secs = duration,
        "clip extracted"
    );
    Ok(())
}

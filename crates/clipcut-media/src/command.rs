//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg invocations.
///
/// Arguments split into an input phase (before `-i`) and an output phase
/// (after it); seek position belongs to the input phase for fast keyframe
/// seeking.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Seek to a timestamp (FFmpeg dot form) before the input for fast seek.
    pub fn seek(self, timestamp: impl Into<String>) -> Self {
        self.input_arg("-ss").input_arg(timestamp)
    }

    /// Limit output duration in seconds.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Stream-copy both video and audio.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Shift timestamps so the cut starts at zero.
    pub fn zero_negative_ts(self) -> Self {
        self.output_arg("-avoid_negative_ts").output_arg("make_zero")
    }

    /// Demuxer concat input mode (`-f concat -safe 0`).
    pub fn concat_input(self) -> Self {
        self.input_arg("-f").input_arg("concat").input_arg("-safe").input_arg("0")
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with an optional timeout.
#[derive(Debug, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run a command to completion, mapping a non-zero exit to an error
    /// carrying the stderr tail.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(
                std::time::Duration::from_secs(timeout_secs),
                child.wait_with_output(),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(timeout_secs, "ffmpeg timed out");
                    return Err(MediaError::Timeout(timeout_secs));
                }
            }
        } else {
            child.wait_with_output().await?
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            Err(MediaError::ffmpeg_failed(tail, output.status.code()))
        }
    }
}

/// Check that FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check that FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_order() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .seek("00:00:02.500")
            .duration(2.5)
            .stream_copy()
            .zero_negative_ts();

        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        let t = args.iter().position(|a| a == "-t").unwrap();
        // Fast seek: -ss precedes -i; duration follows it
        assert!(ss < i);
        assert!(i < t);
        assert!(args.contains(&"-y".to_string()));
        assert!(args.contains(&"copy".to_string()));
        assert!(args.contains(&"make_zero".to_string()));
        assert_eq!(args[t + 1], "2.500");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_concat_input_args() {
        let cmd = FfmpegCommand::new("list.txt", "out.mp4").concat_input().stream_copy();
        let args = cmd.build_args();
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "concat");
        assert!(args.contains(&"-safe".to_string()));
    }
}

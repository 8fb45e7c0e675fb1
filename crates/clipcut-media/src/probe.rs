//! FFprobe media inspection.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Basic media facts extracted from FFprobe's format block.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub size: u64,
    /// Overall bitrate in bits per second
    pub bitrate: u64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    bit_rate: Option<String>,
}

/// Probe a media file for duration, size, and bitrate.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path.as_ref())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::ffmpeg_failed(
            format!("ffprobe: {}", stderr.trim()),
            output.status.code(),
        ));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::ffmpeg_failed(format!("unreadable ffprobe output: {}", e), None))?;

    Ok(MediaInfo {
        duration: parsed
            .format
            .duration
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        size: parsed.format.size.and_then(|s| s.parse().ok()).unwrap_or(0),
        bitrate: parsed
            .format
            .bit_rate
            .and_then(|b| b.parse().ok())
            .unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_output_parsing() {
        let raw = r#"{"format": {"duration": "9.000000", "size": "1048576", "bit_rate": "931072"}}"#;
        let parsed: ProbeOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.format.duration.as_deref(), Some("9.000000"));
        assert_eq!(parsed.format.size.as_deref(), Some("1048576"));
    }
}

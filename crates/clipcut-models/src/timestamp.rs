//! SRT timestamp parsing and formatting utilities.
//!
//! Artifact files store times verbatim as `HH:MM:SS,mmm` strings; arithmetic
//! happens on a seconds representation and converts back only at emission.
//! The round trip is exact to the millisecond.

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) to total seconds.
///
/// A `.` millisecond separator is accepted as well, since FFmpeg-style
/// timestamps differ from SRT only in that character.
///
/// # Examples
/// ```
/// use clipcut_models::timestamp::to_seconds;
/// assert_eq!(to_seconds("00:01:30,500").unwrap(), 90.5);
/// assert_eq!(to_seconds("01:00:00,000").unwrap(), 3600.0);
/// ```
pub fn to_seconds(ts: &str) -> Result<f64, SrtTimeError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(SrtTimeError::Empty);
    }

    let normalized = ts.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return Err(SrtTimeError::InvalidFormat(ts.to_string()));
    }

    let hours: u64 = parts[0]
        .parse()
        .map_err(|_| SrtTimeError::InvalidValue("hours", parts[0].to_string()))?;
    let minutes: u64 = parts[1]
        .parse()
        .map_err(|_| SrtTimeError::InvalidValue("minutes", parts[1].to_string()))?;

    let (secs_str, millis_str) = match parts[2].split_once('.') {
        Some((s, m)) => (s, m),
        None => (parts[2], "0"),
    };
    let seconds: u64 = secs_str
        .parse()
        .map_err(|_| SrtTimeError::InvalidValue("seconds", secs_str.to_string()))?;
    // Pad/truncate to millisecond precision ("5" means 500ms, "5000" is capped)
    let millis: u64 = format!("{:0<3}", millis_str)
        .chars()
        .take(3)
        .collect::<String>()
        .parse()
        .map_err(|_| SrtTimeError::InvalidValue("milliseconds", millis_str.to_string()))?;

    let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis;
    Ok(total_ms as f64 / 1000.0)
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// # Examples
/// ```
/// use clipcut_models::timestamp::from_seconds;
/// assert_eq!(from_seconds(90.5), "00:01:30,500");
/// assert_eq!(from_seconds(0.0), "00:00:00,000");
/// ```
pub fn from_seconds(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Check whether a string is a strictly formatted SRT timestamp.
///
/// Strict form is `HH:MM:SS,mmm` with exactly two digits per clock field and
/// three millisecond digits; this is the shape required of LLM-emitted times.
pub fn is_srt_time(ts: &str) -> bool {
    let bytes = ts.as_bytes();
    if bytes.len() != 12 {
        return false;
    }
    for (i, b) in bytes.iter().enumerate() {
        match i {
            2 | 5 => {
                if *b != b':' {
                    return false;
                }
            }
            8 => {
                if *b != b',' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_digit() {
                    return false;
                }
            }
        }
    }
    true
}

/// Convert an SRT timestamp to the FFmpeg form (`,` becomes `.`).
pub fn srt_to_ffmpeg(ts: &str) -> String {
    ts.replace(',', ".")
}

/// SRT timestamp parsing error.
#[derive(Debug, Clone, PartialEq)]
pub enum SrtTimeError {
    /// Timestamp string is empty
    Empty,
    /// Invalid numeric value for a component
    InvalidValue(&'static str, String),
    /// Not an HH:MM:SS,mmm timestamp
    InvalidFormat(String),
}

impl std::fmt::Display for SrtTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "timestamp cannot be empty"),
            Self::InvalidValue(component, value) => {
                write!(f, "invalid {} value: {}", component, value)
            }
            Self::InvalidFormat(ts) => {
                write!(f, "invalid timestamp format '{}', expected HH:MM:SS,mmm", ts)
            }
        }
    }
}

impl std::error::Error for SrtTimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_seconds() {
        assert_eq!(to_seconds("00:00:00,000").unwrap(), 0.0);
        assert_eq!(to_seconds("00:00:02,500").unwrap(), 2.5);
        assert_eq!(to_seconds("00:01:30,000").unwrap(), 90.0);
        assert_eq!(to_seconds("01:01:01,123").unwrap(), 3661.123);
    }

    #[test]
    fn test_to_seconds_accepts_dot_separator() {
        assert_eq!(to_seconds("00:00:06,140").unwrap(), to_seconds("00:00:06.140").unwrap());
    }

    #[test]
    fn test_to_seconds_errors() {
        assert!(matches!(to_seconds(""), Err(SrtTimeError::Empty)));
        assert!(matches!(to_seconds("90"), Err(SrtTimeError::InvalidFormat(_))));
        assert!(matches!(to_seconds("aa:bb:cc,ddd"), Err(SrtTimeError::InvalidValue(_, _))));
    }

    #[test]
    fn test_from_seconds() {
        assert_eq!(from_seconds(0.0), "00:00:00,000");
        assert_eq!(from_seconds(2.5), "00:00:02,500");
        assert_eq!(from_seconds(3661.123), "01:01:01,123");
    }

    #[test]
    fn test_round_trip_exact() {
        for ts in ["00:00:00,000", "00:00:02,500", "00:59:59,999", "12:34:56,789"] {
            assert_eq!(from_seconds(to_seconds(ts).unwrap()), ts);
        }
    }

    #[test]
    fn test_is_srt_time() {
        assert!(is_srt_time("00:01:25,140"));
        assert!(!is_srt_time("00:01:25.140"));
        assert!(!is_srt_time("0:01:25,140"));
        assert!(!is_srt_time("00:01:25,14"));
        assert!(!is_srt_time("end"));
    }

    #[test]
    fn test_srt_to_ffmpeg() {
        assert_eq!(srt_to_ffmpeg("00:01:25,140"), "00:01:25.140");
    }
}

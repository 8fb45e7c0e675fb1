//! SRT file parsing.

use std::path::Path;

use tracing::warn;

use clipcut_models::timestamp::to_seconds;
use clipcut_models::Cue;

use crate::error::{SubtitleError, SubtitleResult};

/// Parse an SRT file into an ordered cue sequence.
///
/// Accepts UTF-8 with or without a BOM. Blank or malformed blocks are skipped
/// with a warning; an empty file yields an empty sequence. Only a file whose
/// structure is unrecognizable as SRT (content present, nothing parseable)
/// fails.
pub fn parse_srt_file(path: impl AsRef<Path>) -> SubtitleResult<Vec<Cue>> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    parse_srt_str(&raw)
}

/// Parse SRT content from a string. See [`parse_srt_file`].
pub fn parse_srt_str(raw: &str) -> SubtitleResult<Vec<Cue>> {
    let content = raw.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let normalized = content.replace("\r\n", "\n");
    let mut cues = Vec::new();
    let mut blocks = 0usize;

    for block in normalized.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        blocks += 1;
        match parse_block(block) {
            Some(cue) => cues.push(cue),
            None => warn!(block = %block.lines().next().unwrap_or(""), "skipping malformed subtitle block"),
        }
    }

    if cues.is_empty() && blocks > 0 {
        return Err(SubtitleError::InvalidSubtitle(
            "no parseable cue blocks found".to_string(),
        ));
    }

    Ok(cues)
}

fn parse_block(block: &str) -> Option<Cue> {
    let mut lines = block.lines();

    let index: u32 = lines.next()?.trim().parse().ok()?;

    let timing = lines.next()?;
    let (start, end) = timing.split_once("-->")?;
    let start_time = start.trim().to_string();
    let end_time = end.trim().to_string();
    // Reject blocks whose timing line does not carry real timestamps
    to_seconds(&start_time).ok()?;
    to_seconds(&end_time).ok()?;

    let text = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some(Cue::new(index, start_time, end_time, text))
}

/// Concatenate the text of every cue overlapping `[start, end]`.
///
/// Overlap is computed in seconds; cues touching the window boundary count.
pub fn extract_text_in_range(cues: &[Cue], start: &str, end: &str) -> String {
    let (Ok(win_start), Ok(win_end)) = (to_seconds(start), to_seconds(end)) else {
        return String::new();
    };

    let mut parts = Vec::new();
    for cue in cues {
        let (Ok(cue_start), Ok(cue_end)) = (to_seconds(&cue.start_time), to_seconds(&cue.end_time))
        else {
            continue;
        };
        if cue_start <= win_end && cue_end >= win_start {
            parts.push(cue.text.as_str());
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,000\nHello world.\n\n2\n00:00:02,500 --> 00:00:05,000\nInvesting in stocks requires patience.\n\n3\n00:00:06,200 --> 00:00:09,000\nCooking pasta is easy.\n";

    #[test]
    fn test_parse_basic() {
        let cues = parse_srt_str(SAMPLE).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[1].start_time, "00:00:02,500");
        assert_eq!(cues[2].text, "Cooking pasta is easy.");
    }

    #[test]
    fn test_parse_with_bom_and_crlf() {
        let raw = format!("\u{feff}{}", SAMPLE.replace('\n', "\r\n"));
        let cues = parse_srt_str(&raw).unwrap();
        assert_eq!(cues.len(), 3);
    }

    #[test]
    fn test_empty_file_yields_empty_sequence() {
        assert!(parse_srt_str("").unwrap().is_empty());
        assert!(parse_srt_str("   \n\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_block_skipped() {
        let raw = format!("not a cue\n\n{}", SAMPLE);
        let cues = parse_srt_str(&raw).unwrap();
        assert_eq!(cues.len(), 3);
    }

    #[test]
    fn test_unrecognizable_content_fails() {
        let raw = "just some prose\n\nwith paragraphs but no cues";
        assert!(matches!(
            parse_srt_str(raw),
            Err(SubtitleError::InvalidSubtitle(_))
        ));
    }

    #[test]
    fn test_multiline_cue_text() {
        let raw = "1\n00:00:00,000 --> 00:00:02,000\nline one\nline two\n";
        let cues = parse_srt_str(raw).unwrap();
        assert_eq!(cues[0].text, "line one\nline two");
    }

    #[test]
    fn test_extract_text_in_range() {
        let cues = parse_srt_str(SAMPLE).unwrap();
        let text = extract_text_in_range(&cues, "00:00:02,500", "00:00:05,000");
        assert_eq!(text, "Investing in stocks requires patience.");

        let all = extract_text_in_range(&cues, "00:00:00,000", "00:00:09,000");
        assert!(all.contains("Hello world."));
        assert!(all.contains("Cooking pasta is easy."));
    }

    #[test]
    fn test_extract_text_boundary_overlap() {
        let cues = parse_srt_str(SAMPLE).unwrap();
        // Window ending exactly at a cue's start includes it
        let text = extract_text_in_range(&cues, "00:00:05,000", "00:00:06,200");
        assert!(text.contains("patience"));
        assert!(text.contains("pasta"));
    }
}

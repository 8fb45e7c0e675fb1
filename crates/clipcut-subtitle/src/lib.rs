//! Subtitle parsing and transcript chunking.
//!
//! This crate turns an SRT file into an ordered cue sequence and splits that
//! sequence into pause-aligned chunks of roughly equal duration for batched
//! model calls downstream.

pub mod chunker;
pub mod error;
pub mod parser;

pub use chunker::{chunk_cues, ChunkOptions};
pub use error::{SubtitleError, SubtitleResult};
pub use parser::{extract_text_in_range, parse_srt_file, parse_srt_str};

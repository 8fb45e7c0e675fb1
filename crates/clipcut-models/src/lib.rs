//! Shared data models for the ClipCut backend.
//!
//! This crate provides Serde-serializable types for:
//! - Subtitle cues and transcript chunks
//! - Topic outlines, clips, and clip collections
//! - Projects and their processing status
//! - Video category configuration
//! - SRT timestamp parsing and formatting

pub mod category;
pub mod chunk;
pub mod clip;
pub mod collection;
pub mod cue;
pub mod outline;
pub mod project;
pub mod timestamp;

// Re-export common types
pub use category::{CategoryInfo, VideoCategory};
pub use chunk::Chunk;
pub use clip::{sanitize_filename_title, Clip};
pub use collection::{Collection, CollectionType};
pub use cue::Cue;
pub use outline::Outline;
pub use project::{Project, ProjectStatus, StatusSnapshot, TOTAL_STEPS};
pub use timestamp::{from_seconds, is_srt_time, to_seconds, SrtTimeError};

//! Transcript chunk model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Cue;

/// A contiguous slice of the cue sequence, roughly thirty minutes long and
/// carved at a natural pause.
///
/// Chunks are stable across pipeline stages: every downstream record carries
/// its `chunk_index` so stage outputs can be grouped back per chunk for
/// batched model calls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Chunk {
    /// Monotonically increasing chunk number, starting at 0
    pub chunk_index: usize,

    /// All cue text joined with single spaces
    pub text: String,

    /// Start timestamp of the first cue (SRT format)
    pub start_time: String,

    /// End timestamp of the last cue (SRT format)
    pub end_time: String,

    /// The cues belonging to this chunk, in order
    pub srt_entries: Vec<Cue>,
}

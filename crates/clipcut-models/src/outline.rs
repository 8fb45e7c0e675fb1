//! Topic outline model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A topic discovered in one chunk of the transcript.
///
/// Outlines are deduplicated by title across the project; the first
/// occurrence wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Outline {
    /// Topic title as emitted by the model
    pub title: String,

    /// Subtopic bullet lines (capped at 200 chars each at parse time)
    pub subtopics: Vec<String>,

    /// Chunk this topic was found in
    pub chunk_index: usize,
}

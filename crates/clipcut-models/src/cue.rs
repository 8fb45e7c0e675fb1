//! Subtitle cue model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single subtitle entry, immutable once parsed.
///
/// Times are kept verbatim in SRT form (`HH:MM:SS,mmm`); the numbering is the
/// index found in the source file, not a positional offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cue {
    /// Cue number from the subtitle file
    pub index: u32,

    /// Start timestamp (SRT format)
    pub start_time: String,

    /// End timestamp (SRT format)
    pub end_time: String,

    /// Spoken text, trimmed
    pub text: String,
}

impl Cue {
    pub fn new(
        index: u32,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            index,
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
        }
    }
}

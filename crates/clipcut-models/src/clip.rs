//! Clip record and filename sanitization.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A timestamped excerpt of the source video.
///
/// One record evolves through the pipeline: timeline anchoring fills the core
/// fields and assigns the durable `id`, scoring adds `final_score` and
/// `recommend_reason`, title generation adds `generated_title`. The `id` is
/// assigned once, after the global sort by start time, and never changes;
/// it is the key used in filenames, collection references, and download URLs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    /// Durable clip id ("1".."N" in timeline order)
    pub id: String,

    /// The outline title this clip was anchored from
    pub outline: String,

    /// Supporting content lines returned by the timeline model
    #[serde(default)]
    pub content: Vec<String>,

    /// Start timestamp (SRT format), clamped to the chunk window
    pub start_time: String,

    /// End timestamp (SRT format), clamped to the chunk window
    pub end_time: String,

    /// Chunk the clip belongs to
    pub chunk_index: usize,

    /// Composite quality score in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,

    /// Why the scorer recommends (or rejected) this clip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommend_reason: Option<String>,

    /// Short-form title; falls back to `outline` when generation fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_title: Option<String>,
}

impl Clip {
    /// The title to show and to cut files under: the generated title when
    /// present, otherwise the outline.
    pub fn display_title(&self) -> &str {
        self.generated_title.as_deref().unwrap_or(&self.outline)
    }

    /// Score with missing treated as zero.
    pub fn score(&self) -> f64 {
        self.final_score.unwrap_or(0.0)
    }

    /// Numeric value of the durable id, for id-order sorting.
    pub fn id_number(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }

    /// Output filename for the cut clip: `<id>_<safe_title>.mp4`.
    pub fn output_filename(&self) -> String {
        format!("{}_{}.mp4", self.id, sanitize_filename_title(self.display_title()))
    }
}

/// Sanitize a title for use in filenames.
///
/// Characters invalid on either Windows or POSIX (`< > : " | ? * \ /`)
/// become underscores, whitespace runs join as single underscores,
/// leading/trailing dots are stripped, and the result is capped at 100
/// characters with `untitled` as the empty fallback. Non-ASCII titles are
/// kept as-is; downloads transport them via RFC 6266 encoding.
pub fn sanitize_filename_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\' | '/' => '_',
            _ => c,
        })
        .collect();

    let joined = replaced.split_whitespace().collect::<Vec<_>>().join("_");
    let trimmed = joined.trim_matches('.');
    let capped: String = trimmed.chars().take(100).collect();

    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped
    }
}

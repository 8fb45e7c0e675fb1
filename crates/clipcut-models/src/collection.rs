//! Clip collection model.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a collection came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    /// Produced by the clustering stage
    #[default]
    AiRecommended,
    /// Created by an operator through the API
    Manual,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::AiRecommended => "ai_recommended",
            CollectionType::Manual => "manual",
        }
    }
}

/// An ordered group of clips sharing a theme.
///
/// `clip_ids` order defines concatenation order for the compiled video. A
/// valid collection references at least two existing clips and at most the
/// configured maximum.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Collection {
    /// Collection id (decimal, assigned at validation time)
    pub id: String,

    /// Theme title, also the basis of the output filename
    pub collection_title: String,

    /// One-line description of the theme
    pub collection_summary: String,

    /// Durable clip ids in concatenation order
    pub clip_ids: Vec<String>,

    /// Origin of the collection
    #[serde(default)]
    pub collection_type: CollectionType,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Collection {
    /// Output filename for the concatenated video.
    pub fn output_filename(&self) -> String {
        format!("{}.mp4", crate::sanitize_filename_title(&self.collection_title))
    }
}

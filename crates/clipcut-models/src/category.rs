//! Video category configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Content category of a project's source video.
///
/// A closed set: the category selects which prompt variants drive the
/// pipeline, so unknown values are rejected at the API boundary rather than
/// silently mapped to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoCategory {
    #[default]
    Default,
    Knowledge,
    Business,
    Entertainment,
    Lifestyle,
    Emotion,
    Gaming,
    Tech,
}

/// Presentation metadata for a category, served to the frontend.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CategoryInfo {
    pub value: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

impl VideoCategory {
    pub const ALL: [VideoCategory; 8] = [
        VideoCategory::Default,
        VideoCategory::Knowledge,
        VideoCategory::Business,
        VideoCategory::Entertainment,
        VideoCategory::Lifestyle,
        VideoCategory::Emotion,
        VideoCategory::Gaming,
        VideoCategory::Tech,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCategory::Default => "default",
            VideoCategory::Knowledge => "knowledge",
            VideoCategory::Business => "business",
            VideoCategory::Entertainment => "entertainment",
            VideoCategory::Lifestyle => "lifestyle",
            VideoCategory::Emotion => "emotion",
            VideoCategory::Gaming => "gaming",
            VideoCategory::Tech => "tech",
        }
    }

    /// Parse a category value, rejecting anything outside the closed set.
    pub fn parse(value: &str) -> Option<VideoCategory> {
        match value {
            "default" => Some(VideoCategory::Default),
            "knowledge" => Some(VideoCategory::Knowledge),
            "business" => Some(VideoCategory::Business),
            "entertainment" => Some(VideoCategory::Entertainment),
            "lifestyle" => Some(VideoCategory::Lifestyle),
            "emotion" => Some(VideoCategory::Emotion),
            "gaming" => Some(VideoCategory::Gaming),
            "tech" => Some(VideoCategory::Tech),
            _ => None,
        }
    }

    pub fn info(&self) -> CategoryInfo {
        match self {
            VideoCategory::Default => CategoryInfo {
                value: "default",
                name: "General",
                description: "Mixed or uncategorized long-form content",
                icon: "🎬",
                color: "#6b7280",
            },
            VideoCategory::Knowledge => CategoryInfo {
                value: "knowledge",
                name: "Knowledge",
                description: "Lectures, explainers, and educational talks",
                icon: "📚",
                color: "#2563eb",
            },
            VideoCategory::Business => CategoryInfo {
                value: "business",
                name: "Business & Finance",
                description: "Investing, markets, and career topics",
                icon: "📈",
                color: "#059669",
            },
            VideoCategory::Entertainment => CategoryInfo {
                value: "entertainment",
                name: "Entertainment",
                description: "Shows, commentary, and variety streams",
                icon: "🎭",
                color: "#d97706",
            },
            VideoCategory::Lifestyle => CategoryInfo {
                value: "lifestyle",
                name: "Lifestyle",
                description: "Food, travel, health, and daily living",
                icon: "🌿",
                color: "#10b981",
            },
            VideoCategory::Emotion => CategoryInfo {
                value: "emotion",
                name: "Relationships",
                description: "Emotional and interpersonal topics",
                icon: "💬",
                color: "#db2777",
            },
            VideoCategory::Gaming => CategoryInfo {
                value: "gaming",
                name: "Gaming",
                description: "Gameplay, esports, and gaming culture",
                icon: "🎮",
                color: "#7c3aed",
            },
            VideoCategory::Tech => CategoryInfo {
                value: "tech",
                name: "Technology",
                description: "Software, hardware, and internet culture",
                icon: "💻",
                color: "#0891b2",
            },
        }
    }
}

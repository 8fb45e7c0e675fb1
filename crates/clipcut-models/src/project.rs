//! Project record and processing status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::VideoCategory;

/// Number of pipeline stages.
pub const TOTAL_STEPS: u8 = 6;

/// Terminal/processing state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Ingested, never processed
    #[default]
    Created,
    /// A pipeline run is active
    Processing,
    /// All six stages finished
    Completed,
    /// A stage failed; retry resumes from it
    Error,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Created => "created",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
        }
    }
}

/// A video + subtitle pair and the state of its clip extraction.
///
/// The record is a value addressed by id; background work re-reads it from
/// the artifact store and all mutations funnel through the pipeline runner.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    /// Opaque project id
    pub id: String,

    /// Display name
    pub name: String,

    /// Path to the source video, relative to the projects root
    pub video_path: String,

    /// Path to the subtitle file, when one was supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srt_path: Option<String>,

    /// Content category controlling prompt selection
    #[serde(default)]
    pub video_category: VideoCategory,

    /// Processing state
    #[serde(default)]
    pub status: ProjectStatus,

    /// Last attempted stage, 0 when never started
    #[serde(default)]
    pub current_step: u8,

    /// Failure cause when `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        video_path: impl Into<String>,
        video_category: VideoCategory,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            video_path: video_path.into(),
            srt_path: None,
            video_category,
            status: ProjectStatus::Created,
            current_step: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a stage attempt, keeping timestamps fresh.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Snapshot of a run's progress, as projected to the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusSnapshot {
    /// Project state
    pub status: ProjectStatus,

    /// Stage currently (or last) attempted, 1-6
    pub current_step: u8,

    /// Always six
    pub total_steps: u8,

    /// Human-readable stage name
    pub step_name: String,

    /// Percent complete in [0, 100]
    pub progress: f64,

    /// Failure cause when status is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusSnapshot {
    pub fn new(status: ProjectStatus, current_step: u8, step_name: impl Into<String>, progress: f64) -> Self {
        Self {
            status,
            current_step,
            total_steps: TOTAL_STEPS,
            step_name: step_name.into(),
            progress,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_defaults() {
        let p = Project::new("p1", "Talk", "uploads/p1/input/input.mp4", VideoCategory::Default);
        assert_eq!(p.status, ProjectStatus::Created);
        assert_eq!(p.current_step, 0);
        assert!(p.error_message.is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let s = serde_json::to_string(&ProjectStatus::Processing).unwrap();
        assert_eq!(s, "\"processing\"");
    }
}

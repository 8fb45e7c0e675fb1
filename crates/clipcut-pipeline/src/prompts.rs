//! Prompt file loading with per-category fallback.

use std::path::PathBuf;

use clipcut_models::VideoCategory;

use crate::error::{PipelineError, PipelineResult};

/// The five prompt roles driving the LLM stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    Outline,
    Timeline,
    Recommendation,
    Title,
    Clustering,
}

impl PromptRole {
    pub fn file_name(&self) -> &'static str {
        match self {
            PromptRole::Outline => "outline.txt",
            PromptRole::Timeline => "timeline.txt",
            PromptRole::Recommendation => "recommendation.txt",
            PromptRole::Title => "title.txt",
            PromptRole::Clustering => "clustering.txt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::Outline => "outline",
            PromptRole::Timeline => "timeline",
            PromptRole::Recommendation => "recommendation",
            PromptRole::Title => "title",
            PromptRole::Clustering => "clustering",
        }
    }
}

/// Loads prompt text from `prompt/<category>/<role>.txt`, falling back
/// file-by-file to the defaults at `prompt/<role>.txt`.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompt_dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(prompt_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompt_dir: prompt_dir.into(),
        }
    }

    /// Write a minimal default file for any role missing one, so a fresh
    /// checkout can process a project before anyone has authored prompts.
    pub fn ensure_defaults(&self) -> PipelineResult<()> {
        const DEFAULTS: [(PromptRole, &str); 5] = [
            (
                PromptRole::Outline,
                "Analyze the following transcript chunk and list its main topics.\nAnswer with numbered lines in the form `1. **Title**` followed by `- subtopic` bullets.",
            ),
            (
                PromptRole::Timeline,
                "For each topic in the outline, locate its time range in the SRT transcript.\nAnswer with a JSON array of {\"outline\", \"content\", \"start_time\", \"end_time\"} using HH:MM:SS,mmm times.",
            ),
            (
                PromptRole::Recommendation,
                "Score each clip for short-form potential.\nAnswer with a JSON array of {\"final_score\" (0 to 1), \"recommend_reason\"}, one entry per input clip, in input order.",
            ),
            (
                PromptRole::Title,
                "Write a catchy short-form title for each clip.\nAnswer with a JSON object mapping clip id to title.",
            ),
            (
                PromptRole::Clustering,
                "Group related clips into themed collections of 2 to 5 clips.\nAnswer with a JSON array of {\"collection_title\", \"collection_summary\", \"clips\": [clip titles]}.",
            ),
        ];

        std::fs::create_dir_all(&self.prompt_dir)?;
        for (role, content) in DEFAULTS {
            let path = self.prompt_dir.join(role.file_name());
            if !path.exists() {
                std::fs::write(&path, content)?;
            }
        }
        Ok(())
    }

    /// Resolve and read the prompt for a role under a category.
    pub fn load(&self, role: PromptRole, category: VideoCategory) -> PipelineResult<String> {
        let category_path = self
            .prompt_dir
            .join(category.as_str())
            .join(role.file_name());
        let default_path = self.prompt_dir.join(role.file_name());

        for path in [&category_path, &default_path] {
            if path.is_file() {
                return Ok(std::fs::read_to_string(path)?);
            }
        }

        Err(PipelineError::PromptMissing {
            role: role.as_str(),
            searched: format!("{} and {}", category_path.display(), default_path.display()),
        })
    }
}

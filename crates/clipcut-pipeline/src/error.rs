//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("missing input file: {0}")]
    MissingInput(String),

    #[error("prompt file not found for role '{role}' (looked under {searched})")]
    PromptMissing { role: &'static str, searched: String },

    #[error("stage {stage} failed: {message}")]
    StageFailed { stage: u8, message: String },

    #[error("subtitle error: {0}")]
    Subtitle(#[from] clipcut_subtitle::SubtitleError),

    #[error("LLM error: {0}")]
    Llm(#[from] clipcut_llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] clipcut_storage::StorageError),

    #[error("media error: {0}")]
    Media(#[from] clipcut_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn stage_failed(stage: u8, message: impl Into<String>) -> Self {
        Self::StageFailed {
            stage,
            message: message.into(),
        }
    }

    /// Single-sentence form for the project record; diagnostic detail stays
    /// in logs and on disk.
    pub fn user_message(&self) -> String {
        let full = self.to_string();
        let sentence = full.lines().next().unwrap_or("").to_string();
        if sentence.chars().count() > 200 {
            let truncated: String = sentence.chars().take(200).collect();
            format!("{}…", truncated)
        } else {
            sentence
        }
    }
}

//! The six pipeline stages.
//!
//! Each stage reads only artifacts produced by earlier stages, treats chunks
//! independently, and writes its own artifact last. A per-item failure never
//! escapes its chunk; a per-chunk failure never fails the stage while other
//! chunks still have work; a stage failure propagates to the runner.

pub mod clustering;
pub mod media;
pub mod outline;
pub mod scoring;
pub mod timeline;
pub mod title;

use std::path::PathBuf;
use std::sync::Arc;

use clipcut_llm::LlmClient;
use clipcut_models::VideoCategory;
use clipcut_storage::{ArtifactStore, ProjectPaths};

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::media_processor::MediaProcessor;
use crate::prompts::PromptLibrary;

/// Everything a stage needs to run against one project.
pub struct StageContext {
    pub project_id: String,
    pub category: VideoCategory,
    pub store: ArtifactStore,
    pub paths: ProjectPaths,
    pub llm: Arc<LlmClient>,
    pub prompts: Arc<PromptLibrary>,
    pub media: Arc<dyn MediaProcessor>,
    pub config: Arc<AppConfig>,
}

impl StageContext {
    /// The project's source video under `input/`: `input.<ext>` for any
    /// extension except `.srt`.
    pub fn locate_input_video(&self) -> PipelineResult<PathBuf> {
        let input_dir = &self.paths.input_dir;
        if input_dir.is_dir() {
            for entry in std::fs::read_dir(input_dir)? {
                let path = entry?.path();
                let is_srt = path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("srt"))
                    .unwrap_or(false);
                if path.is_file() && !is_srt {
                    return Ok(path);
                }
            }
        }
        Err(PipelineError::MissingInput(format!(
            "no source video under {}",
            input_dir.display()
        )))
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use async_trait::async_trait;
    use clipcut_llm::{LlmResult, LlmTransport};
    use clipcut_media::MediaResult;
    use std::path::Path;

    struct SilentTransport;

    #[async_trait]
    impl LlmTransport for SilentTransport {
        async fn generate(&self, _prompt: &str) -> LlmResult<String> {
            Err(clipcut_llm::LlmError::EmptyResponse)
        }
    }

    struct NoopMedia;

    #[async_trait]
    impl MediaProcessor for NoopMedia {
        async fn extract(
            &self,
            _input: &Path,
            _output: &Path,
            _start: &str,
            _end: &str,
        ) -> MediaResult<()> {
            Ok(())
        }

        async fn concat(&self, _files: &[std::path::PathBuf], _output: &Path) -> MediaResult<()> {
            Ok(())
        }
    }

    /// A context over a scratch directory with inert LLM and media stubs.
    pub(crate) fn context(root: &Path, config: Arc<AppConfig>) -> StageContext {
        let store = ArtifactStore::new(root.join("uploads"));
        store.ensure_project_directories("test").unwrap();
        StageContext {
            project_id: "test".to_string(),
            category: VideoCategory::Default,
            paths: store.paths("test"),
            store,
            llm: Arc::new(clipcut_llm::LlmClient::new(Box::new(SilentTransport), 1)),
            prompts: Arc::new(PromptLibrary::new(root.join("prompt"))),
            media: Arc::new(NoopMedia),
            config,
        }
    }
}

/// Human-readable stage names, also used by the progress projection.
pub fn stage_name(stage: u8) -> &'static str {
    match stage {
        1 => "Outline extraction",
        2 => "Timeline anchoring",
        3 => "Scoring",
        4 => "Title generation",
        5 => "Clustering",
        6 => "Media generation",
        _ => "Unknown",
    }
}

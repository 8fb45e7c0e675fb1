//! Project directory layout.

use std::path::{Path, PathBuf};

/// Typed view of one project's directory tree:
///
/// ```text
/// <projects_root>/<project_id>/
///   input/{input.<ext>, input.srt}
///   output/
///     clips/<clip_id>_<safe_title>.mp4
///     collections/<safe_collection_title>.mp4
///     metadata/step*.json, *_metadata.json, final_results.json, ...
///   logs/
///   temp/
/// ```
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub project_base: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub clips_dir: PathBuf,
    pub collections_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(projects_root: impl AsRef<Path>, project_id: &str) -> Self {
        let project_base = projects_root.as_ref().join(project_id);
        let output_dir = project_base.join("output");
        Self {
            input_dir: project_base.join("input"),
            clips_dir: output_dir.join("clips"),
            collections_dir: output_dir.join("collections"),
            metadata_dir: output_dir.join("metadata"),
            logs_dir: project_base.join("logs"),
            temp_dir: project_base.join("temp"),
            output_dir,
            project_base,
        }
    }

    /// Every directory that must exist before processing.
    pub fn all_dirs(&self) -> [&PathBuf; 7] {
        [
            &self.input_dir,
            &self.output_dir,
            &self.clips_dir,
            &self.collections_dir,
            &self.metadata_dir,
            &self.logs_dir,
            &self.temp_dir,
        ]
    }

    pub fn input_srt(&self) -> PathBuf {
        self.input_dir.join("input.srt")
    }

    pub fn input_video(&self, ext: &str) -> PathBuf {
        self.input_dir.join(format!("input.{}", ext))
    }

    // ------------------------------------------------------------------
    // Stage artifacts
    // ------------------------------------------------------------------

    pub fn outline_file(&self) -> PathBuf {
        self.metadata_dir.join("step1_outline.json")
    }

    pub fn text_chunks_dir(&self) -> PathBuf {
        self.metadata_dir.join("step1_chunks")
    }

    pub fn text_chunk_file(&self, chunk_index: usize) -> PathBuf {
        self.text_chunks_dir().join(format!("chunk_{}.txt", chunk_index))
    }

    pub fn srt_chunks_dir(&self) -> PathBuf {
        self.metadata_dir.join("step1_srt_chunks")
    }

    pub fn srt_chunk_file(&self, chunk_index: usize) -> PathBuf {
        self.srt_chunks_dir().join(format!("chunk_{}.json", chunk_index))
    }

    pub fn timeline_file(&self) -> PathBuf {
        self.metadata_dir.join("step2_timeline.json")
    }

    pub fn timeline_chunks_dir(&self) -> PathBuf {
        self.metadata_dir.join("step2_timeline_chunks")
    }

    pub fn timeline_chunk_file(&self, chunk_index: usize) -> PathBuf {
        self.timeline_chunks_dir().join(format!("chunk_{}.json", chunk_index))
    }

    pub fn timeline_raw_dir(&self) -> PathBuf {
        self.metadata_dir.join("step2_llm_raw_output")
    }

    pub fn timeline_raw_file(&self, chunk_index: usize) -> PathBuf {
        self.timeline_raw_dir().join(format!("chunk_{}.txt", chunk_index))
    }

    pub fn timeline_raw_attempt_file(&self, chunk_index: usize, attempt: u32) -> PathBuf {
        self.timeline_raw_dir()
            .join(format!("chunk_{}_attempt_{}.txt", chunk_index, attempt))
    }

    pub fn all_scored_file(&self) -> PathBuf {
        self.metadata_dir.join("step3_all_scored.json")
    }

    pub fn high_score_file(&self) -> PathBuf {
        self.metadata_dir.join("step3_high_score_clips.json")
    }

    pub fn titles_file(&self) -> PathBuf {
        self.metadata_dir.join("step4_titles.json")
    }

    pub fn titles_raw_dir(&self) -> PathBuf {
        self.metadata_dir.join("step4_llm_raw_output")
    }

    pub fn titles_raw_file(&self, chunk_index: usize) -> PathBuf {
        self.titles_raw_dir().join(format!("chunk_{}.txt", chunk_index))
    }

    pub fn collections_file(&self) -> PathBuf {
        self.metadata_dir.join("step5_collections.json")
    }

    pub fn clips_metadata_file(&self) -> PathBuf {
        self.metadata_dir.join("clips_metadata.json")
    }

    pub fn collections_metadata_file(&self) -> PathBuf {
        self.metadata_dir.join("collections_metadata.json")
    }

    pub fn final_results_file(&self) -> PathBuf {
        self.metadata_dir.join("final_results.json")
    }

    pub fn project_metadata_file(&self) -> PathBuf {
        self.metadata_dir.join("project_metadata.json")
    }

    /// Per-stage completion marker; a stage is complete iff this exists.
    pub fn step_result_file(&self, step: u8) -> PathBuf {
        self.metadata_dir.join(format!("step{}_result.json", step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let p = ProjectPaths::new("/data/uploads", "abc");
        assert_eq!(p.input_srt(), PathBuf::from("/data/uploads/abc/input/input.srt"));
        assert_eq!(
            p.outline_file(),
            PathBuf::from("/data/uploads/abc/output/metadata/step1_outline.json")
        );
        assert_eq!(
            p.srt_chunk_file(3),
            PathBuf::from("/data/uploads/abc/output/metadata/step1_srt_chunks/chunk_3.json")
        );
        assert_eq!(
            p.timeline_raw_attempt_file(0, 2),
            PathBuf::from(
                "/data/uploads/abc/output/metadata/step2_llm_raw_output/chunk_0_attempt_2.txt"
            )
        );
        assert_eq!(
            p.step_result_file(4),
            PathBuf::from("/data/uploads/abc/output/metadata/step4_result.json")
        );
    }
}

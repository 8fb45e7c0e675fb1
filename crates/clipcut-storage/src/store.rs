//! Atomic artifact reads and writes.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use clipcut_models::{Project, ProjectStatus, TOTAL_STEPS};

use crate::error::StorageResult;
use crate::paths::ProjectPaths;

/// Filesystem-backed store for project records and stage artifacts.
///
/// One instance per process, rooted at the projects directory. The store is
/// the idle-time owner of every artifact; during a run the pipeline runner is
/// the single writer.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self, project_id: &str) -> ProjectPaths {
        ProjectPaths::new(&self.root, project_id)
    }

    /// Create the full project tree; safe to call repeatedly.
    pub fn ensure_project_directories(&self, project_id: &str) -> StorageResult<()> {
        let paths = self.paths(project_id);
        for dir in paths.all_dirs() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn project_exists(&self, project_id: &str) -> bool {
        self.paths(project_id).project_base.is_dir()
    }

    // ------------------------------------------------------------------
    // Raw file primitives
    // ------------------------------------------------------------------

    /// Write a file atomically: the content lands in a sibling temp file
    /// first and is renamed over the destination, so readers never observe a
    /// torn write.
    pub fn write_atomic(&self, path: impl AsRef<Path>, bytes: &[u8]) -> StorageResult<()> {
        let path = path.as_ref();
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(path)?;
        debug!(path = %path.display(), "artifact written");
        Ok(())
    }

    /// Serialize a value as pretty two-space JSON (non-ASCII preserved) and
    /// write it atomically.
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_atomic(path, json.as_bytes())
    }

    /// Read a JSON artifact. Absence is `None`, never an error.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<Option<T>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn write_text(&self, path: impl AsRef<Path>, text: &str) -> StorageResult<()> {
        self.write_atomic(path, text.as_bytes())
    }

    pub fn read_text(&self, path: impl AsRef<Path>) -> StorageResult<Option<String>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    // ------------------------------------------------------------------
    // Project records
    // ------------------------------------------------------------------

    pub fn save_project(&self, project: &Project) -> StorageResult<()> {
        let paths = self.paths(&project.id);
        self.write_json(paths.project_metadata_file(), project)
    }

    pub fn load_project(&self, project_id: &str) -> StorageResult<Option<Project>> {
        let paths = self.paths(project_id);
        self.read_json(paths.project_metadata_file())
    }

    /// All projects found under the root, newest first.
    pub fn list_projects(&self) -> StorageResult<Vec<Project>> {
        let mut projects = Vec::new();
        if !self.root.is_dir() {
            return Ok(projects);
        }
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            if let Some(project) = self.load_project(&id)? {
                projects.push(project);
            }
        }
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    pub fn delete_project(&self, project_id: &str) -> StorageResult<()> {
        let paths = self.paths(project_id);
        if paths.project_base.is_dir() {
            std::fs::remove_dir_all(&paths.project_base)?;
            info!(project_id, "project deleted");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stage completion markers
    // ------------------------------------------------------------------

    /// Write the stage completion marker and advance the project record.
    pub fn save_step_result<T: Serialize>(
        &self,
        project_id: &str,
        step: u8,
        result: &T,
    ) -> StorageResult<()> {
        let paths = self.paths(project_id);
        self.write_json(paths.step_result_file(step), result)?;

        if let Some(mut project) = self.load_project(project_id)? {
            project.current_step = step;
            if step >= TOTAL_STEPS {
                project.status = ProjectStatus::Completed;
            }
            project.touch();
            self.save_project(&project)?;
        }
        Ok(())
    }

    /// A stage is complete iff its marker exists.
    pub fn step_completed(&self, project_id: &str, step: u8) -> bool {
        self.paths(project_id).step_result_file(step).exists()
    }

    /// Highest stage whose marker exists; 0 when none do. Used to re-derive
    /// status after a restart.
    pub fn last_completed_step(&self, project_id: &str) -> u8 {
        (1..=TOTAL_STEPS)
            .filter(|step| self.step_completed(project_id, *step))
            .max()
            .unwrap_or(0)
    }
}

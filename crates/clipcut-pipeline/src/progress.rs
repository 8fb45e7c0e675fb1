//! In-memory progress projection.
//!
//! The runner writes snapshots here; the HTTP layer reads them. The map is
//! eventually consistent with the on-disk project metadata; after a restart
//! a project's status is re-derived from its stage completion markers.

use std::collections::HashMap;
use std::sync::Mutex;

use clipcut_models::{Project, ProjectStatus, StatusSnapshot};
use clipcut_storage::ArtifactStore;

use crate::stages::stage_name;

/// Shared project-id → status snapshot map.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    snapshots: Mutex<HashMap<String, StatusSnapshot>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, project_id: &str, snapshot: StatusSnapshot) {
        self.snapshots
            .lock()
            .expect("progress map poisoned")
            .insert(project_id.to_string(), snapshot);
    }

    pub fn get(&self, project_id: &str) -> Option<StatusSnapshot> {
        self.snapshots
            .lock()
            .expect("progress map poisoned")
            .get(project_id)
            .cloned()
    }

    pub fn remove(&self, project_id: &str) {
        self.snapshots
            .lock()
            .expect("progress map poisoned")
            .remove(project_id);
    }

    /// Current snapshot, or one re-derived from disk when the in-memory map
    /// has nothing (fresh process, completed earlier run).
    pub fn get_or_derive(&self, project: &Project, store: &ArtifactStore) -> StatusSnapshot {
        if let Some(snapshot) = self.get(&project.id) {
            return snapshot;
        }
        derive_from_disk(project, store)
    }
}

/// Build a snapshot from the project record and its stage markers.
pub fn derive_from_disk(project: &Project, store: &ArtifactStore) -> StatusSnapshot {
    let last_step = store.last_completed_step(&project.id);
    let progress = f64::from(last_step) / 6.0 * 100.0;
    let step_name = if last_step == 0 {
        "Not started".to_string()
    } else {
        stage_name(last_step).to_string()
    };

    let mut snapshot = StatusSnapshot::new(project.status, last_step.max(project.current_step), step_name, progress);
    if project.status == ProjectStatus::Error {
        snapshot.error_message = project.error_message.clone();
    }
    snapshot
}

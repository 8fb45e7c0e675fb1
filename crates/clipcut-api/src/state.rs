//! Shared application state.

use clipcut_pipeline::PipelineRunner;
use clipcut_storage::ArtifactStore;

/// State handed to every handler. Cloning is cheap; the runner is a shared
/// handle.
#[derive(Clone)]
pub struct AppState {
    pub runner: PipelineRunner,
}

impl AppState {
    pub fn new(runner: PipelineRunner) -> Self {
        Self { runner }
    }

    pub fn store(&self) -> &ArtifactStore {
        self.runner.store()
    }
}

//! The pipeline runner.
//!
//! Drives stages 1–6 for one project on a background task. Admission is
//! decided under a single process-wide mutex: a project can have at most one
//! active run, and at most `max_concurrent_processing` projects run at once.
//! The occupied slot is released by a drop guard so a crashed worker cannot
//! leak it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use clipcut_llm::LlmClient;
use clipcut_models::{ProjectStatus, StatusSnapshot, TOTAL_STEPS};
use clipcut_storage::ArtifactStore;

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::media_processor::MediaProcessor;
use crate::progress::ProgressTracker;
use crate::prompts::PromptLibrary;
use crate::stages::{self, stage_name, StageContext};

/// Why a run could not be started.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("maximum concurrent processing reached")]
    Busy,

    #[error("project already has an active run")]
    Conflict,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project is in state '{actual}', expected '{expected}'")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("storage error: {0}")]
    Storage(#[from] clipcut_storage::StorageError),
}

/// Observer invoked at entry to and exit from every stage with
/// `(current_stage, total, stage_name, percent)`.
pub type ProgressObserver = dyn Fn(u8, u8, &str, f64) + Send + Sync;

struct RunnerState {
    active_runs: usize,
    active_projects: HashSet<String>,
}

struct Inner {
    store: ArtifactStore,
    llm: Arc<LlmClient>,
    prompts: Arc<PromptLibrary>,
    media: Arc<dyn MediaProcessor>,
    config: Arc<AppConfig>,
    progress: ProgressTracker,
    state: Mutex<RunnerState>,
    observer: Option<Box<ProgressObserver>>,
}

/// Handle used by the HTTP layer to start runs and read status.
#[derive(Clone)]
pub struct PipelineRunner {
    inner: Arc<Inner>,
}

impl PipelineRunner {
    pub fn new(
        store: ArtifactStore,
        llm: Arc<LlmClient>,
        prompts: Arc<PromptLibrary>,
        media: Arc<dyn MediaProcessor>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                llm,
                prompts,
                media,
                config,
                progress: ProgressTracker::new(),
                state: Mutex::new(RunnerState {
                    active_runs: 0,
                    active_projects: HashSet::new(),
                }),
                observer: None,
            }),
        }
    }

    /// Attach a progress observer. Only available before the runner is
    /// shared, hence the by-value signature.
    pub fn with_observer(mut self, observer: Box<ProgressObserver>) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("observer must be attached before the runner is shared")
            .observer = Some(observer);
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.inner.progress
    }

    /// Start processing from stage 1.
    pub fn start(&self, project_id: &str) -> Result<(), StartError> {
        self.run_from(project_id, 1)
    }

    /// Resume a failed project from its last attempted stage.
    pub fn retry(&self, project_id: &str) -> Result<(), StartError> {
        let project = self
            .inner
            .store
            .load_project(project_id)?
            .ok_or_else(|| StartError::ProjectNotFound(project_id.to_string()))?;

        if project.status != ProjectStatus::Error {
            return Err(StartError::InvalidState {
                expected: ProjectStatus::Error.as_str(),
                actual: project.status.as_str(),
            });
        }

        let last_attempted = self
            .inner
            .progress
            .get(project_id)
            .map(|s| s.current_step)
            .filter(|s| *s > 0)
            .unwrap_or(project.current_step);
        let start_stage = last_attempted.clamp(1, TOTAL_STEPS);

        info!(project_id, start_stage, "retrying failed project");
        self.run_from(project_id, start_stage)
    }

    /// Start processing at `start_stage`, reusing all earlier artifacts.
    pub fn run_from(&self, project_id: &str, start_stage: u8) -> Result<(), StartError> {
        let mut project = self
            .inner
            .store
            .load_project(project_id)?
            .ok_or_else(|| StartError::ProjectNotFound(project_id.to_string()))?;

        {
            let mut state = self.inner.state.lock().expect("runner state poisoned");
            if state.active_projects.contains(project_id) {
                return Err(StartError::Conflict);
            }
            if state.active_runs >= self.inner.config.max_concurrent_processing {
                return Err(StartError::Busy);
            }
            state.active_runs += 1;
            state.active_projects.insert(project_id.to_string());
        }

        project.status = ProjectStatus::Processing;
        project.error_message = None;
        project.touch();
        if let Err(e) = self.inner.store.save_project(&project) {
            release_slot(&self.inner, project_id);
            return Err(e.into());
        }

        let start_stage = start_stage.clamp(1, TOTAL_STEPS);
        let inner = self.inner.clone();
        let id = project_id.to_string();
        tokio::spawn(async move {
            let _slot = SlotGuard {
                inner: inner.clone(),
                project_id: id.clone(),
            };

            match run_stages(&inner, &id, start_stage).await {
                Ok(()) => info!(project_id = %id, "pipeline completed"),
                Err(e) => {
                    error!(project_id = %id, error = %e, "pipeline failed");
                    mark_error(&inner, &id, &e);
                }
            }
        });

        Ok(())
    }

    /// Status snapshot for the HTTP layer; derived from disk when the
    /// in-memory projection has nothing for this project.
    pub fn status(&self, project_id: &str) -> Result<Option<StatusSnapshot>, StartError> {
        let Some(project) = self.inner.store.load_project(project_id)? else {
            return Ok(None);
        };
        Ok(Some(
            self.inner.progress.get_or_derive(&project, &self.inner.store),
        ))
    }

    /// Number of currently active runs (test and ops introspection).
    pub fn active_runs(&self) -> usize {
        self.inner.state.lock().expect("runner state poisoned").active_runs
    }
}

struct SlotGuard {
    inner: Arc<Inner>,
    project_id: String,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        release_slot(&self.inner, &self.project_id);
    }
}

fn release_slot(inner: &Inner, project_id: &str) {
    let mut state = inner.state.lock().expect("runner state poisoned");
    state.active_runs = state.active_runs.saturating_sub(1);
    state.active_projects.remove(project_id);
}

fn report(inner: &Inner, project_id: &str, stage: u8, name: &str, percent: f64, status: ProjectStatus) {
    let mut snapshot = StatusSnapshot::new(status, stage, name, percent);
    if status == ProjectStatus::Completed {
        snapshot.progress = 100.0;
    }
    inner.progress.update(project_id, snapshot);
    if let Some(observer) = &inner.observer {
        observer(stage, TOTAL_STEPS, name, percent);
    }
}

async fn run_stages(inner: &Arc<Inner>, project_id: &str, start_stage: u8) -> PipelineResult<()> {
    let project = inner
        .store
        .load_project(project_id)?
        .ok_or_else(|| PipelineError::ProjectNotFound(project_id.to_string()))?;

    inner.store.ensure_project_directories(project_id)?;

    let ctx = StageContext {
        project_id: project_id.to_string(),
        category: project.video_category,
        paths: inner.store.paths(project_id),
        store: inner.store.clone(),
        llm: inner.llm.clone(),
        prompts: inner.prompts.clone(),
        media: inner.media.clone(),
        config: inner.config.clone(),
    };

    for stage in start_stage..=TOTAL_STEPS {
        let entry_pct = f64::from(stage - 1) / 6.0 * 100.0;
        report(inner, project_id, stage, stage_name(stage), entry_pct, ProjectStatus::Processing);

        // Record the attempt before running, so retry knows where to resume
        if let Some(mut p) = inner.store.load_project(project_id)? {
            p.current_step = stage;
            p.status = ProjectStatus::Processing;
            p.touch();
            inner.store.save_project(&p)?;
        }

        let result = match stage {
            1 => json!({ "outlines": stages::outline::run(&ctx).await? }),
            2 => json!({ "timeline": stages::timeline::run(&ctx).await? }),
            3 => json!({ "high_score_clips": stages::scoring::run(&ctx).await? }),
            4 => json!({ "clips_with_titles": stages::title::run(&ctx).await? }),
            5 => json!({ "collections": stages::clustering::run(&ctx).await? }),
            6 => serde_json::to_value(stages::media::run(&ctx).await?)
                .map_err(|e| PipelineError::stage_failed(6, e.to_string()))?,
            _ => unreachable!("stage out of range"),
        };

        inner.store.save_step_result(project_id, stage, &result)?;

        let exit_pct = f64::from(stage) / 6.0 * 100.0;
        let exit_status = if stage == TOTAL_STEPS {
            ProjectStatus::Completed
        } else {
            ProjectStatus::Processing
        };
        let exit_name = format!("{} complete", stage_name(stage));
        report(inner, project_id, stage, &exit_name, exit_pct, exit_status);
    }

    write_final_results(inner, &ctx)?;
    Ok(())
}

/// Aggregate the per-stage artifacts into `final_results.json`.
fn write_final_results(inner: &Inner, ctx: &StageContext) -> PipelineResult<()> {
    use serde_json::Value;

    let read = |path: std::path::PathBuf| -> PipelineResult<Value> {
        Ok(inner.store.read_json::<Value>(path)?.unwrap_or(Value::Array(vec![])))
    };

    let final_results = json!({
        "step1_outlines": read(ctx.paths.outline_file())?,
        "step2_timeline": read(ctx.paths.timeline_file())?,
        "step3_scoring": read(ctx.paths.high_score_file())?,
        "step4_titles": read(ctx.paths.titles_file())?,
        "step5_collections": read(ctx.paths.collections_file())?,
        "step6_video": inner.store.read_json::<Value>(ctx.paths.step_result_file(6))?
            .unwrap_or(Value::Null),
    });
    inner.store.write_json(ctx.paths.final_results_file(), &final_results)?;
    Ok(())
}

/// Flip the project to `error` with a single-sentence cause; artifacts are
/// left in place for retry.
fn mark_error(inner: &Inner, project_id: &str, err: &PipelineError) {
    let message = err.user_message();

    match inner.store.load_project(project_id) {
        Ok(Some(mut project)) => {
            project.status = ProjectStatus::Error;
            project.error_message = Some(message.clone());
            project.touch();
            let current_step = project.current_step;
            if let Err(e) = inner.store.save_project(&project) {
                error!(project_id, error = %e, "failed to persist error state");
            }
            let mut snapshot = StatusSnapshot::new(
                ProjectStatus::Error,
                current_step,
                "Processing failed",
                0.0,
            );
            snapshot.error_message = Some(message);
            inner.progress.update(project_id, snapshot);
        }
        other => {
            error!(project_id, ?other, "failed to load project while marking error");
        }
    }
}

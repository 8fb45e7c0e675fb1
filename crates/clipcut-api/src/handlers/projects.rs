//! Project lifecycle handlers: ingestion, run control, status, deletion.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use clipcut_models::{Clip, Collection, Project, StatusSnapshot, VideoCategory};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const ALLOWED_VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Project record plus its presentation-layer clips and collections.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub clips: Vec<Clip>,
    pub collections: Vec<Collection>,
}

/// `POST /api/projects/upload`: multipart ingestion of a video plus an
/// optional subtitle track.
pub async fn upload_project(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Project>> {
    let mut video: Option<(String, Vec<u8>)> = None;
    let mut srt: Option<Vec<u8>> = None;
    let mut project_name: Option<String> = None;
    let mut category_value: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "video_file" => {
                let filename = field.file_name().unwrap_or("input.mp4").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read video: {}", e)))?;
                video = Some((filename, bytes.to_vec()));
            }
            "srt_file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read subtitles: {}", e)))?;
                srt = Some(bytes.to_vec());
            }
            "project_name" => {
                project_name = field.text().await.ok();
            }
            "video_category" => {
                category_value = field.text().await.ok();
            }
            other => {
                info!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let (filename, video_bytes) =
        video.ok_or_else(|| ApiError::bad_request("video_file is required"))?;

    let ext = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::bad_request(format!(
            "unsupported video format '{}', expected one of {:?}",
            ext, ALLOWED_VIDEO_EXTENSIONS
        )));
    }

    let category = match category_value.as_deref() {
        None | Some("") => VideoCategory::default(),
        Some(value) => VideoCategory::parse(value)
            .ok_or_else(|| ApiError::bad_request(format!("unknown video category '{}'", value)))?,
    };

    let project_id = Uuid::new_v4().to_string();
    let store = state.store();
    store.ensure_project_directories(&project_id)?;

    let paths = store.paths(&project_id);
    store.write_atomic(paths.input_video(&ext), &video_bytes)?;
    if let Some(srt_bytes) = &srt {
        store.write_atomic(paths.input_srt(), srt_bytes)?;
    }

    let name = project_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| filename.clone());
    let mut project = Project::new(
        &project_id,
        name,
        format!("{}/input/input.{}", project_id, ext),
        category,
    );
    if srt.is_some() {
        project.srt_path = Some(format!("{}/input/input.srt", project_id));
    }
    store.save_project(&project)?;

    info!(project_id, "project ingested");
    Ok(Json(project))
}

/// `GET /api/projects`
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.store().list_projects()?))
}

/// `GET /api/projects/{id}`: record plus hydrated clips and collections.
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetail>> {
    let store = state.store();
    let project = store
        .load_project(&project_id)?
        .ok_or_else(|| ApiError::not_found(format!("project {}", project_id)))?;

    let paths = store.paths(&project_id);
    let clips: Vec<Clip> = store
        .read_json(paths.clips_metadata_file())?
        .or(store.read_json(paths.titles_file())?)
        .unwrap_or_default();
    let collections: Vec<Collection> = store
        .read_json(paths.collections_metadata_file())?
        .or(store.read_json(paths.collections_file())?)
        .unwrap_or_default();

    Ok(Json(ProjectDetail {
        project,
        clips,
        collections,
    }))
}

/// `DELETE /api/projects/{id}`
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = state.store();
    if store.load_project(&project_id)?.is_none() {
        return Err(ApiError::not_found(format!("project {}", project_id)));
    }
    store.delete_project(&project_id)?;
    state.runner.progress().remove(&project_id);
    Ok(Json(json!({ "message": "project deleted" })))
}

/// `POST /api/projects/{id}/process`: start from stage 1.
pub async fn process_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.runner.start(&project_id)?;
    Ok(Json(json!({ "message": "processing started" })))
}

/// `POST /api/projects/{id}/retry`: resume a failed run from the stage
/// that failed.
pub async fn retry_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.runner.retry(&project_id)?;
    Ok(Json(json!({ "message": "retry started" })))
}

/// `GET /api/projects/{id}/status`
pub async fn get_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<StatusSnapshot>> {
    let snapshot = state
        .runner
        .status(&project_id)?
        .ok_or_else(|| ApiError::not_found(format!("project {}", project_id)))?;
    Ok(Json(snapshot))
}

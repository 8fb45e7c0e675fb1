//! Manual collection creation.
//!
//! The runner owns the collection metadata until stage 6 completes; manual
//! collections are only accepted afterwards, keeping a single writer on the
//! file at all times.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use clipcut_models::{Clip, Collection, CollectionType, ProjectStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub collection_title: String,
    #[serde(default)]
    pub collection_summary: String,
    pub clip_ids: Vec<String>,
}

/// `POST /api/projects/{id}/collections`
pub async fn create_collection(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<CreateCollectionRequest>,
) -> ApiResult<Json<Collection>> {
    let store = state.store();
    let project = store
        .load_project(&project_id)?
        .ok_or_else(|| ApiError::not_found(format!("project {}", project_id)))?;

    if project.status != ProjectStatus::Completed {
        return Err(ApiError::Conflict(
            "collections can only be edited after processing completes".to_string(),
        ));
    }

    if request.collection_title.trim().is_empty() {
        return Err(ApiError::bad_request("collection_title must not be empty"));
    }
    if request.clip_ids.len() < 2 {
        return Err(ApiError::bad_request("a collection needs at least two clips"));
    }
    let max = state.runner.config().max_clips_per_collection;
    if request.clip_ids.len() > max {
        return Err(ApiError::bad_request(format!(
            "a collection holds at most {} clips",
            max
        )));
    }

    let paths = store.paths(&project_id);
    let clips: Vec<Clip> = store
        .read_json(paths.clips_metadata_file())?
        .or(store.read_json(paths.titles_file())?)
        .unwrap_or_default();
    for clip_id in &request.clip_ids {
        if !clips.iter().any(|c| &c.id == clip_id) {
            return Err(ApiError::bad_request(format!("unknown clip id '{}'", clip_id)));
        }
    }

    let mut collections: Vec<Collection> = store
        .read_json(paths.collections_metadata_file())?
        .unwrap_or_default();

    let next_id = collections
        .iter()
        .filter_map(|c| c.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;

    let collection = Collection {
        id: next_id.to_string(),
        collection_title: request.collection_title.trim().to_string(),
        collection_summary: request.collection_summary,
        clip_ids: request.clip_ids,
        collection_type: CollectionType::Manual,
        created_at: Some(Utc::now()),
    };
    collections.push(collection.clone());
    store.write_json(paths.collections_metadata_file(), &collections)?;

    Ok(Json(collection))
}

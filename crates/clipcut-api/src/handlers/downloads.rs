//! Clip and collection file delivery.

use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;

use clipcut_models::{sanitize_filename_title, Collection};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/projects/{id}/clips/{clip_id}/download`
///
/// Clips are addressed by durable id; the file is the first
/// `<clip_id>_*.mp4` match in the clips directory.
pub async fn download_clip(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store();
    if store.load_project(&project_id)?.is_none() {
        return Err(ApiError::not_found(format!("project {}", project_id)));
    }

    let clips_dir = store.paths(&project_id).clips_dir;
    let path = first_match(&clips_dir, &format!("{}_", clip_id))
        .ok_or_else(|| ApiError::not_found(format!("clip {}", clip_id)))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("{}.mp4", clip_id));
    serve_file(path, &filename).await
}

/// `GET /api/projects/{id}/collections/{collection_id}/download`
///
/// The filename derives from the collection title; fallbacks cover files
/// written before a rename landed.
pub async fn download_collection(
    State(state): State<AppState>,
    Path((project_id, collection_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store();
    if store.load_project(&project_id)?.is_none() {
        return Err(ApiError::not_found(format!("project {}", project_id)));
    }

    let paths = store.paths(&project_id);
    let collections: Vec<Collection> = store
        .read_json(paths.collections_metadata_file())?
        .or(store.read_json(paths.collections_file())?)
        .unwrap_or_default();
    let collection = collections
        .iter()
        .find(|c| c.id == collection_id)
        .ok_or_else(|| ApiError::not_found(format!("collection {}", collection_id)))?;

    let dir = &paths.collections_dir;
    let by_title = dir.join(format!("{}.mp4", sanitize_filename_title(&collection.collection_title)));
    let by_id = dir.join(format!("{}.mp4", collection_id));

    let path = if by_title.is_file() {
        by_title
    } else if by_id.is_file() {
        by_id
    } else {
        any_file(dir).ok_or_else(|| {
            ApiError::not_found(format!("no media for collection {}", collection_id))
        })?
    };

    let filename = format!("{}.mp4", collection.collection_title);
    serve_file(path, &filename).await
}

async fn serve_file(path: PathBuf, filename: &str) -> ApiResult<impl IntoResponse> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read {}: {}", path.display(), e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(filename))
            .map_err(|e| ApiError::internal(format!("bad disposition header: {}", e)))?,
    );
    Ok((headers, bytes))
}

/// RFC 6266 attachment disposition; `filename*` transports non-ASCII titles.
fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

fn first_match(dir: &std::path::Path, prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map(|e| e == "mp4").unwrap_or(false)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(prefix))
                    .unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

fn any_file(dir: &std::path::Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("clip.mp4"),
            "attachment; filename*=UTF-8''clip.mp4"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let header = content_disposition("投资理财.mp4");
        assert!(header.starts_with("attachment; filename*=UTF-8''"));
        assert!(header.is_ascii());
        assert!(header.contains("%E6%8A%95"));
    }

    #[test]
    fn test_first_match_prefix_anchored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1_a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("11_b.mp4"), b"x").unwrap();

        let found = first_match(dir.path(), "1_").unwrap();
        assert!(found.ends_with("1_a.mp4"));
        assert!(first_match(dir.path(), "2_").is_none());
    }
}

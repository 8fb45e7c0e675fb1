//! Stage 6: media generation.
//!
//! Cuts one file per titled clip, then concatenates each collection from the
//! cut files in `clip_ids` order. A single clip or collection failure logs
//! and moves on; the stage completes with the successful subset. The
//! presentation metadata views are written last.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use clipcut_models::{Clip, Collection};

use crate::error::PipelineResult;
use crate::stages::StageContext;

/// What stage 6 produced, recorded in its completion marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSummary {
    pub clips_generated: usize,
    pub collections_generated: usize,
    pub clip_paths: Vec<String>,
    pub collection_paths: Vec<String>,
}

pub async fn run(ctx: &StageContext) -> PipelineResult<MediaSummary> {
    info!(project_id = %ctx.project_id, "generating media");

    let clips: Vec<Clip> = ctx
        .store
        .read_json(ctx.paths.titles_file())?
        .unwrap_or_default();
    let collections: Vec<Collection> = ctx
        .store
        .read_json(ctx.paths.collections_file())?
        .unwrap_or_default();

    let mut clip_paths = Vec::new();
    if !clips.is_empty() {
        let source = ctx.locate_input_video()?;
        for clip in &clips {
            let output = ctx.paths.clips_dir.join(clip.output_filename());
            match ctx
                .media
                .extract(&source, &output, &clip.start_time, &clip.end_time)
                .await
            {
                Ok(()) => clip_paths.push(output.to_string_lossy().to_string()),
                Err(e) => {
                    warn!(clip_id = %clip.id, error = %e, "clip cut failed, continuing");
                }
            }
        }
    }

    let mut collection_paths = Vec::new();
    for collection in &collections {
        let files = member_files(ctx, collection);
        if files.is_empty() {
            warn!(collection_id = %collection.id, "no member clip files found, skipping collection");
            continue;
        }
        let output = ctx.paths.collections_dir.join(collection.output_filename());
        match ctx.media.concat(&files, &output).await {
            Ok(()) => collection_paths.push(output.to_string_lossy().to_string()),
            Err(e) => {
                warn!(collection_id = %collection.id, error = %e, "collection concat failed, continuing");
            }
        }
    }

    // Presentation-layer views; the step4/step5 artifacts stay untouched
    ctx.store.write_json(ctx.paths.clips_metadata_file(), &clips)?;
    ctx.store.write_json(ctx.paths.collections_metadata_file(), &collections)?;

    let summary = MediaSummary {
        clips_generated: clip_paths.len(),
        collections_generated: collection_paths.len(),
        clip_paths,
        collection_paths,
    };
    info!(
        clips = summary.clips_generated,
        collections = summary.collections_generated,
        "media generation complete"
    );
    Ok(summary)
}

/// Locate the member clip files by `<clip_id>_*.mp4` glob, preserving
/// `clip_ids` order, which defines concatenation order.
fn member_files(ctx: &StageContext, collection: &Collection) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for clip_id in &collection.clip_ids {
        match find_clip_file(ctx, clip_id) {
            Some(path) => files.push(path),
            None => warn!(collection_id = %collection.id, clip_id, "member clip file not found"),
        }
    }
    files
}

/// First `<clip_id>_*.mp4` match in the clips directory.
pub fn find_clip_file(ctx: &StageContext, clip_id: &str) -> Option<PathBuf> {
    let prefix = format!("{}_", clip_id);
    let entries = std::fs::read_dir(&ctx.paths.clips_dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map(|e| e == "mp4").unwrap_or(false)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&prefix))
                    .unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

//! Stage 1: outline extraction.
//!
//! Chunks the parsed subtitles, persists per-chunk text and cue files for
//! later stages, then asks the model for an ordered topic list per chunk.
//! Per-project outlines are the concatenation of per-chunk lists, first-wins
//! deduplicated by title.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use clipcut_models::{Chunk, Outline};
use clipcut_subtitle::{chunk_cues, parse_srt_file, ChunkOptions};

use crate::error::PipelineResult;
use crate::prompts::PromptRole;
use crate::stages::StageContext;

static NUMBERED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*\*\*").expect("title regex"));

/// Subtopic bullets longer than this are model noise, not structure.
const MAX_SUBTOPIC_CHARS: usize = 200;

pub async fn run(ctx: &StageContext) -> PipelineResult<Vec<Outline>> {
    info!(project_id = %ctx.project_id, "extracting outline");

    let srt_path = ctx.paths.input_srt();
    let cues = if srt_path.is_file() {
        parse_srt_file(&srt_path)?
    } else {
        Vec::new()
    };

    let chunks = chunk_cues(
        &cues,
        ChunkOptions {
            interval_minutes: ctx.config.chunk_interval_minutes,
            pause_threshold_ms: ctx.config.pause_threshold_ms,
        },
    );
    info!(chunks = chunks.len(), "subtitles chunked");

    save_chunks(ctx, &chunks)?;

    let prompt = ctx.prompts.load(PromptRole::Outline, ctx.category)?;
    let mut all_outlines = Vec::new();

    for chunk in &chunks {
        let input = json!({
            "text": chunk.text,
            "topic_count_range": [ctx.config.min_topics_per_chunk, ctx.config.max_topics_per_chunk],
            "topic_duration_minutes": {
                "min": ctx.config.min_topic_duration_minutes,
                "max": ctx.config.max_topic_duration_minutes,
                "target": ctx.config.target_topic_duration_minutes,
            },
        });

        match ctx.llm.call(&prompt, Some(&input)).await {
            Ok(response) if !response.is_empty() => {
                let outlines = parse_outline_response(&response, chunk.chunk_index);
                info!(chunk = chunk.chunk_index, topics = outlines.len(), "chunk outlined");
                all_outlines.extend(outlines);
            }
            Ok(_) => {
                warn!(chunk = chunk.chunk_index, "empty outline response, skipping chunk");
            }
            Err(e) => {
                warn!(chunk = chunk.chunk_index, error = %e, "outline call failed, skipping chunk");
            }
        }
    }

    let merged = merge_outlines(all_outlines);
    ctx.store.write_json(ctx.paths.outline_file(), &merged)?;

    info!(topics = merged.len(), "outline extraction complete");
    Ok(merged)
}

/// Persist chunk text (`step1_chunks/`) and cue lists (`step1_srt_chunks/`)
/// so stage 2 and resume paths can reload them without re-chunking.
fn save_chunks(ctx: &StageContext, chunks: &[Chunk]) -> PipelineResult<()> {
    for chunk in chunks {
        ctx.store
            .write_text(ctx.paths.text_chunk_file(chunk.chunk_index), &chunk.text)?;
        ctx.store
            .write_json(ctx.paths.srt_chunk_file(chunk.chunk_index), &chunk.srt_entries)?;
    }
    Ok(())
}

/// Parse the Markdown outline the model emits: numbered `**Title**` lines
/// followed by `- subtopic` bullets.
fn parse_outline_response(response: &str, chunk_index: usize) -> Vec<Outline> {
    let mut outlines = Vec::new();
    let mut current: Option<Outline> = None;

    for line in response.lines() {
        let line = line.trim();

        if NUMBERED_TITLE.is_match(line) {
            if let Some(outline) = current.take() {
                outlines.push(outline);
            }
            let title = line
                .split("**")
                .nth(1)
                .map(str::to_string)
                .or_else(|| line.split_once('.').map(|(_, rest)| rest.trim().to_string()))
                .unwrap_or_else(|| line.to_string());
            current = Some(Outline {
                title,
                subtopics: Vec::new(),
                chunk_index,
            });
        } else if let Some(subtopic) = line.strip_prefix('-') {
            if let Some(outline) = current.as_mut() {
                let subtopic = subtopic.trim();
                if !subtopic.is_empty() && subtopic.chars().count() <= MAX_SUBTOPIC_CHARS {
                    outline.subtopics.push(subtopic.to_string());
                }
            }
        }
    }

    if let Some(outline) = current {
        outlines.push(outline);
    }
    outlines
}

/// Deduplicate by title, keeping the first occurrence.
fn merge_outlines(outlines: Vec<Outline>) -> Vec<Outline> {
    let mut seen = HashSet::new();
    outlines
        .into_iter()
        .filter(|o| seen.insert(o.title.clone()))
        .collect()
}

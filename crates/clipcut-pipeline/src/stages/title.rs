//! Stage 4: title generation.
//!
//! Batched per chunk: the model gets `{id, title, content, recommend_reason}`
//! per clip and answers with an id → title map. Raw responses are saved for
//! debugging. A clip whose title is missing or malformed keeps its outline as
//! the title; no clip is dropped on failure.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{info, warn};

use clipcut_models::Clip;

use crate::error::PipelineResult;
use crate::prompts::PromptRole;
use crate::stages::StageContext;

pub async fn run(ctx: &StageContext) -> PipelineResult<Vec<Clip>> {
    info!(project_id = %ctx.project_id, "generating titles");

    let high_score: Vec<Clip> = ctx
        .store
        .read_json(ctx.paths.high_score_file())?
        .unwrap_or_default();

    if high_score.is_empty() {
        warn!("no high-score clips to title");
        let empty: Vec<Clip> = Vec::new();
        ctx.store.write_json(ctx.paths.titles_file(), &empty)?;
        return Ok(empty);
    }

    let mut by_chunk: BTreeMap<usize, Vec<Clip>> = BTreeMap::new();
    for clip in high_score {
        by_chunk.entry(clip.chunk_index).or_default().push(clip);
    }

    let prompt = ctx.prompts.load(PromptRole::Title, ctx.category)?;
    let mut all_titled = Vec::new();

    for (chunk_index, mut clips) in by_chunk {
        info!(chunk = chunk_index, clips = clips.len(), "titling chunk batch");
        title_chunk(ctx, &prompt, chunk_index, &mut clips).await?;
        all_titled.extend(clips);
    }

    ctx.store.write_json(ctx.paths.titles_file(), &all_titled)?;
    info!(clips = all_titled.len(), "title generation complete");
    Ok(all_titled)
}

async fn title_chunk(
    ctx: &StageContext,
    prompt: &str,
    chunk_index: usize,
    clips: &mut [Clip],
) -> PipelineResult<()> {
    let input: Value = clips
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "title": c.outline,
                "content": c.content,
                "recommend_reason": c.recommend_reason,
            })
        })
        .collect();

    let titles_map = match ctx.llm.call(prompt, Some(&input)).await {
        Ok(r) if !r.is_empty() => {
            ctx.store.write_text(ctx.paths.titles_raw_file(chunk_index), &r)?;
            match clipcut_llm::parse_json(&r) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    warn!(chunk = chunk_index, "title response is not an object, using outlines");
                    Default::default()
                }
                Err(e) => {
                    warn!(chunk = chunk_index, error = %e, "title response unparsable, using outlines");
                    Default::default()
                }
            }
        }
        Ok(_) => {
            warn!(chunk = chunk_index, "empty title response, using outlines");
            Default::default()
        }
        Err(e) => {
            warn!(chunk = chunk_index, error = %e, "title call failed, using outlines");
            Default::default()
        }
    };

    for clip in clips {
        match titles_map.get(&clip.id).and_then(Value::as_str) {
            Some(title) if !title.trim().is_empty() => {
                clip.generated_title = Some(title.to_string());
            }
            _ => {
                warn!(clip_id = %clip.id, "no usable generated title, falling back to outline");
                clip.generated_title = Some(clip.outline.clone());
            }
        }
    }

    Ok(())
}

//! Stage 3: scoring.
//!
//! One batched model call per chunk evaluates that chunk's clips. The
//! returned array must align with the input by position and length; a
//! mismatched batch marks the whole chunk failed rather than guessing at
//! alignment. Nothing is ever dropped here; failed evaluations score zero
//! and fall out at the threshold filter.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{info, warn};

use clipcut_models::Clip;

use crate::error::PipelineResult;
use crate::prompts::PromptRole;
use crate::stages::StageContext;

const BATCH_FAILED_REASON: &str = "batch evaluation failed";
const ITEM_FAILED_REASON: &str = "evaluation failed";

pub async fn run(ctx: &StageContext) -> PipelineResult<Vec<Clip>> {
    info!(project_id = %ctx.project_id, "scoring clips");

    let timeline: Vec<Clip> = ctx
        .store
        .read_json(ctx.paths.timeline_file())?
        .unwrap_or_default();

    if timeline.is_empty() {
        warn!("no timeline items to score");
        let empty: Vec<Clip> = Vec::new();
        ctx.store.write_json(ctx.paths.all_scored_file(), &empty)?;
        ctx.store.write_json(ctx.paths.high_score_file(), &empty)?;
        return Ok(empty);
    }

    let mut by_chunk: BTreeMap<usize, Vec<Clip>> = BTreeMap::new();
    for clip in timeline {
        by_chunk.entry(clip.chunk_index).or_default().push(clip);
    }

    let prompt = ctx.prompts.load(PromptRole::Recommendation, ctx.category)?;
    let mut all_scored = Vec::new();

    for (chunk_index, mut clips) in by_chunk {
        info!(chunk = chunk_index, clips = clips.len(), "scoring chunk batch");
        score_chunk(ctx, &prompt, chunk_index, &mut clips).await?;
        all_scored.extend(clips);
    }

    ctx.store.write_json(ctx.paths.all_scored_file(), &all_scored)?;

    let mut high_score: Vec<Clip> = all_scored
        .iter()
        .filter(|c| c.score() >= ctx.config.min_score_threshold)
        .cloned()
        .collect();
    // Durable order is timeline order, by id
    high_score.sort_by_key(Clip::id_number);
    ctx.store.write_json(ctx.paths.high_score_file(), &high_score)?;

    info!(
        scored = all_scored.len(),
        high_score = high_score.len(),
        threshold = ctx.config.min_score_threshold,
        "scoring complete"
    );
    Ok(high_score)
}

async fn score_chunk(
    ctx: &StageContext,
    prompt: &str,
    chunk_index: usize,
    clips: &mut [Clip],
) -> PipelineResult<()> {
    let input: Value = clips
        .iter()
        .map(|c| {
            json!({
                "outline": c.outline,
                "content": c.content,
                "start_time": c.start_time,
                "end_time": c.end_time,
            })
        })
        .collect();

    let response = match ctx.llm.call(prompt, Some(&input)).await {
        Ok(r) if !r.is_empty() => r,
        Ok(_) => {
            warn!(chunk = chunk_index, "empty scoring response, marking batch failed");
            mark_batch_failed(clips);
            return Ok(());
        }
        Err(e) => {
            warn!(chunk = chunk_index, error = %e, "scoring call failed, marking batch failed");
            mark_batch_failed(clips);
            return Ok(());
        }
    };

    let parsed = match clipcut_llm::parse_json(&response) {
        Ok(Value::Array(items)) if items.len() == clips.len() => items,
        Ok(Value::Array(items)) => {
            warn!(
                chunk = chunk_index,
                expected = clips.len(),
                got = items.len(),
                "scoring result count mismatch, marking batch failed"
            );
            mark_batch_failed(clips);
            return Ok(());
        }
        Ok(_) => {
            warn!(chunk = chunk_index, "scoring result is not an array, marking batch failed");
            mark_batch_failed(clips);
            return Ok(());
        }
        Err(e) => {
            warn!(chunk = chunk_index, error = %e, "scoring result unparsable, marking batch failed");
            mark_batch_failed(clips);
            return Ok(());
        }
    };

    for (clip, result) in clips.iter_mut().zip(parsed) {
        let score = result.get("final_score").and_then(Value::as_f64);
        let reason = result.get("recommend_reason").and_then(Value::as_str);
        match (score, reason) {
            (Some(score), Some(reason)) => {
                clip.final_score = Some((score.clamp(0.0, 1.0) * 100.0).round() / 100.0);
                clip.recommend_reason = Some(reason.to_string());
            }
            _ => {
                warn!(clip_id = %clip.id, "score or reason missing, marking item failed");
                clip.final_score = Some(0.0);
                clip.recommend_reason = Some(ITEM_FAILED_REASON.to_string());
            }
        }
    }

    Ok(())
}

fn mark_batch_failed(clips: &mut [Clip]) {
    for clip in clips {
        clip.final_score = Some(0.0);
        clip.recommend_reason = Some(BATCH_FAILED_REASON.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str) -> Clip {
        Clip {
            id: id.to_string(),
            outline: format!("topic {}", id),
            content: vec![],
            start_time: "00:00:00,000".to_string(),
            end_time: "00:00:05,000".to_string(),
            chunk_index: 0,
            final_score: None,
            recommend_reason: None,
            generated_title: None,
        }
    }

    #[test]
    fn test_mark_batch_failed() {
        let mut clips = vec![clip("1"), clip("2")];
        mark_batch_failed(&mut clips);
        for c in &clips {
            assert_eq!(c.final_score, Some(0.0));
            assert_eq!(c.recommend_reason.as_deref(), Some(BATCH_FAILED_REASON));
        }
    }
}

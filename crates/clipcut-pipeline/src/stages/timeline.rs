//! Stage 2: timeline anchoring.
//!
//! For each chunk, the model maps that chunk's topics onto the reconstructed
//! SRT transcript and answers with time ranges. Responses are validated and
//! clamped to the chunk window, every raw response is persisted for
//! debugging, and a cached raw response or parsed chunk file short-circuits
//! the model call on re-entry. After all chunks, items are sorted globally
//! by start time and receive their durable ids.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{error, info, warn};

use clipcut_models::timestamp::{is_srt_time, to_seconds};
use clipcut_models::{Clip, Cue, Outline};

use crate::error::PipelineResult;
use crate::prompts::PromptRole;
use crate::stages::StageContext;

/// Extra in-stage attempts when the model's JSON cannot be salvaged.
const MAX_PARSE_RETRIES: u32 = 2;

/// Escalation appended to the prompt input on retry attempts.
const STRICT_JSON_CLAUSE: &str = "IMPORTANT output requirements:\n\
    1. The response must begin with [ and end with ]\n\
    2. Use ASCII double quotes, never typographic quotes\n\
    3. Escape embedded quotes as \\\"\n\
    4. Do not add explanations or code fences\n\
    5. Emit strictly valid JSON";

pub async fn run(ctx: &StageContext) -> PipelineResult<Vec<Clip>> {
    info!(project_id = %ctx.project_id, "anchoring timeline");

    let outlines: Vec<Outline> = ctx
        .store
        .read_json(ctx.paths.outline_file())?
        .unwrap_or_default();

    if outlines.is_empty() {
        warn!("no outlines to anchor");
        let empty: Vec<Clip> = Vec::new();
        ctx.store.write_json(ctx.paths.timeline_file(), &empty)?;
        return Ok(empty);
    }

    let mut by_chunk: BTreeMap<usize, Vec<&Outline>> = BTreeMap::new();
    for outline in &outlines {
        by_chunk.entry(outline.chunk_index).or_default().push(outline);
    }

    let prompt = ctx.prompts.load(PromptRole::Timeline, ctx.category)?;

    for (&chunk_index, chunk_outlines) in &by_chunk {
        if let Some(cached) = ctx
            .store
            .read_json::<Vec<Clip>>(ctx.paths.timeline_chunk_file(chunk_index))?
        {
            if !cached.is_empty() {
                info!(chunk = chunk_index, "reusing parsed timeline chunk");
                continue;
            }
        }

        let Some(cues) = ctx
            .store
            .read_json::<Vec<Cue>>(ctx.paths.srt_chunk_file(chunk_index))?
        else {
            warn!(chunk = chunk_index, "missing cue chunk file, skipping chunk");
            continue;
        };
        if cues.is_empty() {
            warn!(chunk = chunk_index, "empty cue chunk file, skipping chunk");
            continue;
        }

        let chunk_start = cues[0].start_time.clone();
        let chunk_end = cues[cues.len() - 1].end_time.clone();

        // A cached raw response replaces the model call entirely
        if let Some(raw) = ctx.store.read_text(ctx.paths.timeline_raw_file(chunk_index))? {
            info!(chunk = chunk_index, "reusing cached raw timeline response");
            let items = parse_and_validate(&raw, &chunk_start, &chunk_end, chunk_index);
            if !items.is_empty() {
                ctx.store
                    .write_json(ctx.paths.timeline_chunk_file(chunk_index), &items)?;
                continue;
            }
            warn!(chunk = chunk_index, "cached raw response did not validate, calling model");
        }

        anchor_chunk(ctx, &prompt, chunk_index, chunk_outlines, &cues, &chunk_start, &chunk_end)
            .await?;
    }

    // Stitch the final timeline together from every chunk file present
    let mut all_items = Vec::new();
    for &chunk_index in by_chunk.keys() {
        if let Some(items) = ctx
            .store
            .read_json::<Vec<Clip>>(ctx.paths.timeline_chunk_file(chunk_index))?
        {
            all_items.extend(items);
        }
    }

    // Global order by start time (stable), then the durable id assignment
    all_items.sort_by(|a, b| {
        let a_secs = to_seconds(&a.start_time).unwrap_or(0.0);
        let b_secs = to_seconds(&b.start_time).unwrap_or(0.0);
        a_secs.partial_cmp(&b_secs).unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, item) in all_items.iter_mut().enumerate() {
        item.id = (i + 1).to_string();
    }

    ctx.store.write_json(ctx.paths.timeline_file(), &all_items)?;
    info!(items = all_items.len(), "timeline anchored");
    Ok(all_items)
}

#[allow(clippy::too_many_arguments)]
async fn anchor_chunk(
    ctx: &StageContext,
    prompt: &str,
    chunk_index: usize,
    chunk_outlines: &[&Outline],
    cues: &[Cue],
    chunk_start: &str,
    chunk_end: &str,
) -> PipelineResult<()> {
    let srt_text = cues
        .iter()
        .map(|c| format!("{}\n{} --> {}\n{}\n", c.index, c.start_time, c.end_time, c.text))
        .collect::<Vec<_>>()
        .join("\n");

    let clean_outlines: Vec<Value> = chunk_outlines
        .iter()
        .map(|o| json!({"title": o.title, "subtopics": o.subtopics}))
        .collect();

    for attempt in 0..=MAX_PARSE_RETRIES {
        let mut input = json!({
            "outline": clean_outlines,
            "srt_text": srt_text,
        });
        if attempt > 0 {
            input["additional_instruction"] = json!(STRICT_JSON_CLAUSE);
        }

        let raw = match ctx.llm.call(prompt, Some(&input)).await {
            Ok(r) if !r.is_empty() => r,
            Ok(_) => {
                warn!(chunk = chunk_index, "empty timeline response, skipping chunk");
                return Ok(());
            }
            Err(e) => {
                warn!(chunk = chunk_index, error = %e, "timeline call failed, skipping chunk");
                return Ok(());
            }
        };

        ctx.store
            .write_text(ctx.paths.timeline_raw_attempt_file(chunk_index, attempt), &raw)?;

        let items = parse_and_validate(&raw, chunk_start, chunk_end, chunk_index);
        if !items.is_empty() {
            ctx.store
                .write_text(ctx.paths.timeline_raw_file(chunk_index), &raw)?;
            ctx.store
                .write_json(ctx.paths.timeline_chunk_file(chunk_index), &items)?;
            info!(chunk = chunk_index, items = items.len(), "chunk anchored");
            return Ok(());
        }

        if attempt < MAX_PARSE_RETRIES {
            warn!(
                chunk = chunk_index,
                attempt, "timeline response did not validate, retrying with strict formatting"
            );
        } else {
            error!(
                chunk = chunk_index,
                attempts = MAX_PARSE_RETRIES + 1,
                "timeline response never validated, skipping chunk"
            );
        }
    }

    Ok(())
}

/// Parse the model's JSON array and keep only items with all required
/// fields, strictly formatted times, and a positive duration after clamping
/// to the chunk window.
fn parse_and_validate(raw: &str, chunk_start: &str, chunk_end: &str, chunk_index: usize) -> Vec<Clip> {
    let parsed = match clipcut_llm::parse_json(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(chunk = chunk_index, error = %e, "timeline response unparsable");
            return Vec::new();
        }
    };

    let Some(items) = parsed.as_array() else {
        warn!(chunk = chunk_index, "timeline response is not an array");
        return Vec::new();
    };

    let chunk_start_secs = to_seconds(chunk_start).unwrap_or(0.0);
    let chunk_end_secs = to_seconds(chunk_end).unwrap_or(f64::MAX);

    let mut validated = Vec::new();
    for item in items {
        let (Some(outline), Some(start_time), Some(end_time)) = (
            item.get("outline").and_then(Value::as_str),
            item.get("start_time").and_then(Value::as_str),
            item.get("end_time").and_then(Value::as_str),
        ) else {
            warn!(chunk = chunk_index, "timeline item missing required fields, dropped");
            continue;
        };

        if !is_srt_time(start_time) || !is_srt_time(end_time) {
            warn!(
                chunk = chunk_index,
                outline, start_time, end_time, "malformed timestamp, item dropped"
            );
            continue;
        }

        let mut start = start_time.to_string();
        let mut end = end_time.to_string();
        if to_seconds(&start).unwrap_or(0.0) < chunk_start_secs {
            warn!(outline, from = %start, to = %chunk_start, "start clamped to chunk window");
            start = chunk_start.to_string();
        }
        if to_seconds(&end).unwrap_or(f64::MAX) > chunk_end_secs {
            warn!(outline, from = %end, to = %chunk_end, "end clamped to chunk window");
            end = chunk_end.to_string();
        }

        if to_seconds(&start).unwrap_or(0.0) >= to_seconds(&end).unwrap_or(0.0) {
            warn!(outline, "non-positive duration after clamping, item dropped");
            continue;
        }

        let content = item
            .get("content")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        validated.push(Clip {
            id: String::new(),
            outline: outline.to_string(),
            content,
            start_time: start,
            end_time: end,
            chunk_index,
            final_score: None,
            recommend_reason: None,
            generated_title: None,
        });
    }

    validated
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK_START: &str = "00:00:00,000";
    const CHUNK_END: &str = "00:10:00,000";

    #[test]
    fn test_valid_items_pass() {
        let raw = r#"[
            {"outline": "A", "content": ["x"], "start_time": "00:00:02,500", "end_time": "00:00:05,000"},
            {"outline": "B", "start_time": "00:00:06,200", "end_time": "00:00:09,000"}
        ]"#;
        let items = parse_and_validate(raw, CHUNK_START, CHUNK_END, 0);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].outline, "A");
        assert_eq!(items[0].content, vec!["x"]);
        assert!(items[1].content.is_empty());
        assert_eq!(items[1].chunk_index, 0);
    }

    #[test]
    fn test_missing_fields_dropped() {
        let raw = r#"[{"outline": "A", "start_time": "00:00:02,500"}]"#;
        assert!(parse_and_validate(raw, CHUNK_START, CHUNK_END, 0).is_empty());
    }

    #[test]
    fn test_malformed_time_dropped() {
        let raw = r#"[{"outline": "A", "start_time": "0:00:02,5", "end_time": "00:00:05,000"}]"#;
        assert!(parse_and_validate(raw, CHUNK_START, CHUNK_END, 0).is_empty());
    }

    #[test]
    fn test_times_clamped_to_chunk() {
        let raw = r#"[{"outline": "A", "start_time": "00:00:01,000", "end_time": "00:20:00,000"}]"#;
        let items = parse_and_validate(raw, "00:00:02,000", CHUNK_END, 1);
        assert_eq!(items[0].start_time, "00:00:02,000");
        assert_eq!(items[0].end_time, CHUNK_END);
    }

    #[test]
    fn test_inverted_range_dropped() {
        let raw = r#"[{"outline": "A", "start_time": "00:00:05,000", "end_time": "00:00:02,000"}]"#;
        assert!(parse_and_validate(raw, CHUNK_START, CHUNK_END, 0).is_empty());
    }

    #[test]
    fn test_truncated_response_keeps_complete_items() {
        let raw = "[{\"outline\": \"A\", \"start_time\": \"00:00:02,500\", \"end_time\": \"00:00:05,000\"}, {\"outline\": \"B\", \"start_time\": \"00:00:0…";
        let items = parse_and_validate(raw, CHUNK_START, CHUNK_END, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].outline, "A");
    }

    #[test]
    fn test_non_array_rejected() {
        let raw = r#"{"outline": "A"}"#;
        assert!(parse_and_validate(raw, CHUNK_START, CHUNK_END, 0).is_empty());
    }
}

//! Stage 5: thematic clustering.
//!
//! One model call proposes collections by clip title. Two safety nets keep
//! the stage productive when the model underdelivers: a keyword pre-cluster
//! over a fixed theme table (also passed to the model as a hint), and a
//! score-tier bucketing as the last resort. Titles resolve to durable ids
//! through the escalating text matcher.

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use clipcut_models::{Clip, Collection, CollectionType};

use crate::error::PipelineResult;
use crate::matcher::resolve_clip_id;
use crate::prompts::PromptRole;
use crate::stages::StageContext;

/// LLM results with fewer valid collections than this fall back to the
/// pre-cluster mapping.
const MIN_LLM_COLLECTIONS: usize = 3;

/// Fixed theme table: key, display title, summary, keywords.
const THEMES: &[(&str, &str, &str, &[&str])] = &[
    (
        "investing",
        "Investing Insights",
        "Practical investing lessons drawn from lived experience.",
        &["invest", "stock", "fund", "market", "money", "return", "trading", "finance", "wealth", "saving"],
    ),
    (
        "career",
        "Career Growth",
        "Work, skills, and the mindset shifts behind professional growth.",
        &["career", "job", "workplace", "skill", "interview", "promotion", "salary", "resume", "study"],
    ),
    (
        "social-observation",
        "Social Observations",
        "Sharp takes on social phenomena and internet culture.",
        &["society", "social", "phenomenon", "internet", "platform", "trend", "algorithm", "industry", "news"],
    ),
    (
        "culture-difference",
        "Culture Differences",
        "Cross-cultural moments, from food to language.",
        &["culture", "western", "abroad", "language", "food", "travel", "country", "foreign", "tradition"],
    ),
    (
        "livestream-interaction",
        "Livestream Moments",
        "Unscripted interactions straight from the live chat.",
        &["livestream", "stream", "chat", "viewer", "donation", "fan", "subscriber", "live", "gift"],
    ),
    (
        "relationships",
        "Relationships",
        "Dating, friendship, and the psychology in between.",
        &["relationship", "dating", "love", "romance", "friend", "emotional", "breakup", "marriage", "crush"],
    ),
    (
        "health",
        "Healthy Living",
        "Exercise, diet, and everyday health management.",
        &["health", "exercise", "running", "diet", "sleep", "fitness", "workout", "nutrition", "habit"],
    ),
    (
        "creator-platforms",
        "Creator Economy",
        "Content creation and the platform mechanics around it.",
        &["creator", "content", "channel", "video", "upload", "monetization", "audience", "views", "subscriber"],
    ),
];

pub async fn run(ctx: &StageContext) -> PipelineResult<Vec<Collection>> {
    info!(project_id = %ctx.project_id, "clustering clips");

    let clips: Vec<Clip> = ctx
        .store
        .read_json(ctx.paths.titles_file())?
        .unwrap_or_default();

    if clips.is_empty() {
        warn!("no titled clips to cluster");
        let empty: Vec<Collection> = Vec::new();
        ctx.store.write_json(ctx.paths.collections_file(), &empty)?;
        return Ok(empty);
    }

    let pre_clusters = pre_cluster_by_keywords(&clips);
    let prompt = build_prompt(ctx, &clips, &pre_clusters)?;

    let mut collections = match ctx.llm.call(&prompt, None).await {
        Ok(response) if !response.is_empty() => match clipcut_llm::parse_json(&response) {
            Ok(parsed) => validate_collections(ctx, &parsed, &clips),
            Err(e) => {
                warn!(error = %e, "clustering response unparsable");
                Vec::new()
            }
        },
        Ok(_) => {
            warn!("empty clustering response");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "clustering call failed");
            Vec::new()
        }
    };

    if collections.len() < MIN_LLM_COLLECTIONS {
        warn!(
            valid = collections.len(),
            "model clustering underdelivered, using keyword pre-clusters"
        );
        collections = collections_from_pre_clusters(ctx, &pre_clusters);
    }
    if collections.is_empty() {
        warn!("keyword pre-clusters empty, bucketing by score tiers");
        collections = default_collections(ctx, &clips);
    }

    ctx.store.write_json(ctx.paths.collections_file(), &collections)?;
    info!(collections = collections.len(), "clustering complete");
    Ok(collections)
}

/// Map each clip to at most one theme (most keyword hits wins); keep themes
/// with at least two members.
fn pre_cluster_by_keywords(clips: &[Clip]) -> Vec<(&'static str, Vec<String>)> {
    let mut buckets: Vec<(&'static str, Vec<String>)> =
        THEMES.iter().map(|(key, _, _, _)| (*key, Vec::new())).collect();

    for clip in clips {
        let text = format!(
            "{} {}",
            clip.display_title(),
            clip.recommend_reason.as_deref().unwrap_or("")
        )
        .to_lowercase();

        let mut best: Option<(usize, usize)> = None;
        for (theme_idx, (_, _, _, keywords)) in THEMES.iter().enumerate() {
            let hits = keywords.iter().filter(|k| text.contains(**k)).count();
            if hits > 0 && best.map(|(_, b)| hits > b).unwrap_or(true) {
                best = Some((theme_idx, hits));
            }
        }
        if let Some((theme_idx, _)) = best {
            buckets[theme_idx].1.push(clip.id.clone());
        }
    }

    buckets.retain(|(_, ids)| ids.len() >= 2);
    buckets
}

fn build_prompt(
    ctx: &StageContext,
    clips: &[Clip],
    pre_clusters: &[(&'static str, Vec<String>)],
) -> PipelineResult<String> {
    let mut prompt = ctx.prompts.load(PromptRole::Clustering, ctx.category)?;

    prompt.push_str("\n\nClip list:\n");
    for (i, clip) in clips.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. Title: {}\n   Summary: {}\n   Score: {:.2}\n\n",
            i + 1,
            clip.display_title(),
            clip.recommend_reason.as_deref().unwrap_or(""),
            clip.score(),
        ));
    }

    if !pre_clusters.is_empty() {
        prompt.push_str("\nKeyword pre-clustering (for reference only):\n");
        for (theme, ids) in pre_clusters {
            prompt.push_str(&format!("{}: {}\n", theme, ids.join(", ")));
        }
    }

    Ok(prompt)
}

/// Validate the model's collections: required fields, title → id resolution,
/// the two-member minimum, and the size cap.
fn validate_collections(ctx: &StageContext, parsed: &Value, clips: &[Clip]) -> Vec<Collection> {
    let Some(raw_collections) = parsed.as_array() else {
        warn!("clustering response is not an array");
        return Vec::new();
    };

    let mut validated = Vec::new();
    for raw in raw_collections {
        let (Some(title), Some(summary), Some(members)) = (
            raw.get("collection_title").and_then(Value::as_str),
            raw.get("collection_summary").and_then(Value::as_str),
            raw.get("clips").and_then(Value::as_array),
        ) else {
            warn!("collection missing required fields, dropped");
            continue;
        };

        let mut clip_ids = Vec::new();
        for member in members {
            let Some(candidate) = member.as_str() else {
                continue;
            };
            match resolve_clip_id(candidate, clips) {
                Some(id) if !clip_ids.contains(&id) => clip_ids.push(id),
                Some(_) => {}
                None => warn!(candidate, "clip title unresolved"),
            }
        }

        if clip_ids.len() < 2 {
            warn!(title, resolved = clip_ids.len(), "fewer than two resolved clips, collection dropped");
            continue;
        }
        clip_ids.truncate(ctx.config.max_clips_per_collection);

        validated.push(Collection {
            id: (validated.len() + 1).to_string(),
            collection_title: title.to_string(),
            collection_summary: summary.to_string(),
            clip_ids,
            collection_type: CollectionType::AiRecommended,
            created_at: Some(Utc::now()),
        });
    }

    validated
}

fn collections_from_pre_clusters(
    ctx: &StageContext,
    pre_clusters: &[(&'static str, Vec<String>)],
) -> Vec<Collection> {
    let mut collections = Vec::new();
    for (theme_key, ids) in pre_clusters {
        let (_, title, summary, _) = THEMES
            .iter()
            .find(|(key, _, _, _)| key == theme_key)
            .expect("theme key from the fixed table");

        let mut clip_ids = ids.clone();
        clip_ids.truncate(ctx.config.max_clips_per_collection);

        collections.push(Collection {
            id: (collections.len() + 1).to_string(),
            collection_title: (*title).to_string(),
            collection_summary: (*summary).to_string(),
            clip_ids,
            collection_type: CollectionType::AiRecommended,
            created_at: Some(Utc::now()),
        });
    }
    collections
}

/// Last resort: bucket by score tiers.
fn default_collections(ctx: &StageContext, clips: &[Clip]) -> Vec<Collection> {
    let top: Vec<String> = clips.iter().filter(|c| c.score() >= 0.8).map(|c| c.id.clone()).collect();
    let recommended: Vec<String> = clips
        .iter()
        .filter(|c| c.score() >= 0.6 && c.score() < 0.8)
        .map(|c| c.id.clone())
        .collect();

    let mut collections = Vec::new();
    for (title, summary, mut ids) in [
        ("Top Picks", "The highest scoring clips from this video.", top),
        ("Recommended", "Solid clips worth a watch.", recommended),
    ] {
        if ids.len() >= 2 {
            ids.truncate(ctx.config.max_clips_per_collection);
            collections.push(Collection {
                id: (collections.len() + 1).to_string(),
                collection_title: title.to_string(),
                collection_summary: summary.to_string(),
                clip_ids: ids,
                collection_type: CollectionType::AiRecommended,
                created_at: Some(Utc::now()),
            });
        }
    }
    collections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, title: &str, reason: &str, score: f64) -> Clip {
        Clip {
            id: id.to_string(),
            outline: title.to_string(),
            content: vec![],
            start_time: "00:00:00,000".to_string(),
            end_time: "00:00:05,000".to_string(),
            chunk_index: 0,
            final_score: Some(score),
            recommend_reason: Some(reason.to_string()),
            generated_title: Some(title.to_string()),
        }
    }

    #[test]
    fn test_pre_cluster_requires_two_members() {
        let clips = vec![
            clip("1", "Stock market basics", "how to invest", 0.9),
            clip("2", "Fund picking", "invest in funds", 0.8),
            clip("3", "Morning runs", "fitness routine", 0.7),
        ];
        let buckets = pre_cluster_by_keywords(&clips);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].0, "investing");
        assert_eq!(buckets[0].1, vec!["1", "2"]);
    }

    #[test]
    fn test_pre_cluster_picks_best_theme() {
        let clips = vec![
            clip("1", "Investing while livestreaming", "stock market fund trading talk", 0.9),
            clip("2", "Market returns", "stock fund", 0.9),
        ];
        let buckets = pre_cluster_by_keywords(&clips);
        // More investing keywords than livestream keywords
        assert_eq!(buckets[0].0, "investing");
        assert_eq!(buckets[0].1.len(), 2);
    }

    #[test]
    fn test_default_collections_score_tiers() {
        let config = std::sync::Arc::new(crate::config::AppConfig::default());
        let ctx_clips = vec![
            clip("1", "A", "", 0.9),
            clip("2", "B", "", 0.85),
            clip("3", "C", "", 0.65),
            clip("4", "D", "", 0.62),
            clip("5", "E", "", 0.3),
        ];
        // Build a minimal context stand-in: only config is read
        let collections = {
            let top: Vec<String> = ctx_clips.iter().filter(|c| c.score() >= 0.8).map(|c| c.id.clone()).collect();
            assert_eq!(top, vec!["1", "2"]);
            let dir = tempfile::tempdir().unwrap();
            let ctx = crate::stages::tests_support::context(dir.path(), config);
            default_collections(&ctx, &ctx_clips)
        };
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].collection_title, "Top Picks");
        assert_eq!(collections[0].clip_ids, vec!["1", "2"]);
        assert_eq!(collections[1].clip_ids, vec!["3", "4"]);
    }
}

//! Title-to-clip resolution.
//!
//! The clustering model refers to clips by title, and those titles drift:
//! extra punctuation, changed quoting, case differences, Unicode width
//! variants. Resolution escalates through four normalizations per clip and
//! compares against both the generated title and the original outline; the
//! first clip that matches under any strategy wins.

use tracing::debug;

use clipcut_models::Clip;

/// Resolve a model-emitted clip reference to a durable clip id.
///
/// A reference that is already a known decimal id is accepted as-is; titles
/// go through the escalating match. Returns `None` when nothing matches.
pub fn resolve_clip_id(candidate: &str, clips: &[Clip]) -> Option<String> {
    let cleaned = strip_outer_quotes(candidate.trim());

    // Tolerant path: the model sometimes answers with ids directly
    if cleaned.chars().all(|c| c.is_ascii_digit()) && !cleaned.is_empty() {
        if let Some(clip) = clips.iter().find(|c| c.id == cleaned) {
            return Some(clip.id.clone());
        }
    }

    for clip in clips {
        for title in [clip.generated_title.as_deref(), Some(clip.outline.as_str())]
            .into_iter()
            .flatten()
        {
            let title = strip_outer_quotes(title.trim());

            // 1. Exact after trimming and outer-quote stripping
            if cleaned == title {
                return Some(clip.id.clone());
            }

            // 2. Equality ignoring all punctuation and whitespace
            let cand_compact = compact(cleaned);
            let title_compact = compact(title);
            if !cand_compact.is_empty() && cand_compact == title_compact {
                debug!(candidate, clip_id = %clip.id, "matched after punctuation removal");
                return Some(clip.id.clone());
            }

            // 3. Substring containment either direction, same normalization
            if !cand_compact.is_empty()
                && !title_compact.is_empty()
                && (cand_compact.contains(&title_compact) || title_compact.contains(&cand_compact))
            {
                debug!(candidate, clip_id = %clip.id, "matched by containment");
                return Some(clip.id.clone());
            }

            // 4. Case-insensitive, word characters and spaces only
            let cand_loose = loose(cleaned);
            let title_loose = loose(title);
            if !cand_loose.is_empty() && cand_loose == title_loose {
                debug!(candidate, clip_id = %clip.id, "matched case-insensitively");
                return Some(clip.id.clone());
            }
        }
    }

    None
}

fn strip_outer_quotes(s: &str) -> &str {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’')];
    for (open, close) in PAIRS {
        if s.len() >= open.len_utf8() + close.len_utf8()
            && s.starts_with(open)
            && s.ends_with(close)
        {
            return &s[open.len_utf8()..s.len() - close.len_utf8()];
        }
    }
    s
}

/// Keep only letters and digits: drops ASCII and CJK punctuation alike, plus
/// all whitespace.
fn compact(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Keep word characters and spaces, lowercased.
fn loose(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, outline: &str, title: Option<&str>) -> Clip {
        Clip {
            id: id.to_string(),
            outline: outline.to_string(),
            content: vec![],
            start_time: "00:00:00,000".to_string(),
            end_time: "00:00:01,000".to_string(),
            chunk_index: 0,
            final_score: Some(0.9),
            recommend_reason: None,
            generated_title: title.map(|t| t.to_string()),
        }
    }

    #[test]
    fn test_exact_match() {
        let clips = vec![clip("1", "Investing", Some("Patience Pays"))];
        assert_eq!(resolve_clip_id("Patience Pays", &clips), Some("1".to_string()));
        assert_eq!(resolve_clip_id("Investing", &clips), Some("1".to_string()));
    }

    #[test]
    fn test_quoted_candidate() {
        let clips = vec![clip("1", "Investing", Some("Patience Pays"))];
        assert_eq!(resolve_clip_id("\"Patience Pays\"", &clips), Some("1".to_string()));
        assert_eq!(resolve_clip_id("“Patience Pays”", &clips), Some("1".to_string()));
    }

    #[test]
    fn test_punctuation_difference() {
        let clips = vec![clip("1", "Investing", Some("Patience Pays"))];
        assert_eq!(resolve_clip_id("Patience, Pays!", &clips), Some("1".to_string()));
    }

    #[test]
    fn test_case_difference() {
        let clips = vec![clip("1", "Investing", Some("Patience Pays"))];
        assert_eq!(resolve_clip_id("patience pays", &clips), Some("1".to_string()));
    }

    #[test]
    fn test_containment() {
        let clips = vec![clip("2", "Cooking pasta", Some("Pasta 101"))];
        assert_eq!(resolve_clip_id("Pasta 101 (full guide)", &clips), Some("2".to_string()));
    }

    #[test]
    fn test_cjk_punctuation() {
        let clips = vec![clip("3", "文化差异", Some("文化差异趣谈"))];
        assert_eq!(resolve_clip_id("文化差异趣谈！", &clips), Some("3".to_string()));
    }

    #[test]
    fn test_id_fast_path() {
        let clips = vec![clip("7", "Investing", None)];
        assert_eq!(resolve_clip_id("7", &clips), Some("7".to_string()));
        assert_eq!(resolve_clip_id("8", &clips), None);
    }

    #[test]
    fn test_no_match_reports_unresolved() {
        let clips = vec![clip("1", "Investing", Some("Patience Pays"))];
        assert_eq!(resolve_clip_id("Completely unrelated", &clips), None);
    }

    #[test]
    fn test_first_match_wins() {
        let clips = vec![
            clip("1", "Markets", Some("Market Talk")),
            clip("2", "Markets", Some("Market Talk")),
        ];
        assert_eq!(resolve_clip_id("Market Talk", &clips), Some("1".to_string()));
    }
}

//! Pause-aware transcript chunking.

use clipcut_models::timestamp::to_seconds;
use clipcut_models::{Chunk, Cue};

use crate::parser::extract_text_in_range;

/// Chunking tunables.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// Target chunk duration in minutes
    pub interval_minutes: u32,
    /// Minimum silence between consecutive cues that counts as a pause
    pub pause_threshold_ms: u64,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            pause_threshold_ms: 1000,
        }
    }
}

/// Split a cue sequence into chunks of roughly `interval_minutes` each,
/// cutting at natural pauses so no utterance is split mid-sentence.
///
/// For each chunk: the cut point is searched between 90% and 110% of the
/// target time; the first inter-cue gap of at least `pause_threshold_ms`
/// wins. Without an eligible pause the cut falls on the first cue at or past
/// the target, and a cut that would not advance consumes everything left as
/// one final chunk. The result is a partition of the input: no cue is lost
/// or duplicated, and every chunk is non-empty.
pub fn chunk_cues(cues: &[Cue], opts: ChunkOptions) -> Vec<Chunk> {
    if cues.is_empty() {
        return Vec::new();
    }

    let starts: Vec<f64> = cues
        .iter()
        .map(|c| to_seconds(&c.start_time).unwrap_or(0.0))
        .collect();
    let ends: Vec<f64> = cues
        .iter()
        .map(|c| to_seconds(&c.end_time).unwrap_or(0.0))
        .collect();

    let interval_seconds = f64::from(opts.interval_minutes) * 60.0;
    let pause_threshold = opts.pause_threshold_ms as f64 / 1000.0;

    let mut chunks = Vec::new();
    let mut current = 0usize;
    let mut chunk_index = 0usize;
    let mut last_cut_time = 0.0f64;

    while current < cues.len() {
        let target = last_cut_time + interval_seconds;

        // Skip ahead to 90% of the target before looking for a pause
        let mut search = current;
        while search < cues.len() && starts[search] < target * 0.9 {
            search += 1;
        }

        let mut best_cut = None;
        for i in search..cues.len().saturating_sub(1) {
            if starts[i] > target * 1.1 {
                break;
            }
            let pause = starts[i + 1] - ends[i];
            if pause >= pause_threshold {
                best_cut = Some(i + 1);
                break;
            }
        }

        let mut cut = match best_cut {
            Some(i) => i,
            None => {
                // No eligible pause: cut at the first cue reaching the target
                let mut i = current;
                while i < cues.len() && starts[i] < target {
                    i += 1;
                }
                i
            }
        };

        if cut <= current {
            cut = cues.len();
        }

        let entries = &cues[current..cut];
        if entries.is_empty() {
            break;
        }

        let start_time = entries[0].start_time.clone();
        let end_time = entries[entries.len() - 1].end_time.clone();
        let text = extract_text_in_range(entries, &start_time, &end_time);

        chunks.push(Chunk {
            chunk_index,
            text,
            start_time,
            end_time,
            srt_entries: entries.to_vec(),
        });

        chunk_index += 1;
        last_cut_time = ends[cut - 1];
        current = cut;
    }

    chunks
}

use rayon::prelude::*;
use std::cmp::Ordering;

use crate::config::ActivityThresholds;
use crate::errors::PipelineError;
use crate::models::{ChannelActivitySnapshot, ReportDecision};

/// Ranks channels by recent activity. Pure function of snapshots and
/// thresholds: `should_generate` is true iff any window meets its minimum,
/// the rank score is the weighted count sum, and the output is totally
/// ordered (score descending, channel id ascending on ties).
pub fn rank(
    snapshots: &[ChannelActivitySnapshot],
    thresholds: &ActivityThresholds,
) -> Result<Vec<ReportDecision>, PipelineError> {
    let mut decisions = snapshots
        .par_iter()
        .map(|snap| decide(snap, thresholds))
        .collect::<Result<Vec<_>, PipelineError>>()?;

    decisions.sort_by(|a, b| match b.rank_score.total_cmp(&a.rank_score) {
        Ordering::Equal => a.channel_id.cmp(&b.channel_id),
        other => other,
    });
    Ok(decisions)
}

fn decide(
    snap: &ChannelActivitySnapshot,
    thresholds: &ActivityThresholds,
) -> Result<ReportDecision, PipelineError> {
    // fail fast on window names the config does not know
    for name in snap.window_counts.keys() {
        if !thresholds.knows_window(name) {
            return Err(PipelineError::InvalidSnapshot {
                channel_id: snap.channel_id.clone(),
                detail: format!("unknown window '{}'", name),
            });
        }
    }

    let mut should_generate = false;
    let mut score = 0.0f32;
    for t in &thresholds.windows {
        let count = snap.window_counts.get(&t.window).copied().unwrap_or(0);
        if count >= t.min_count {
            should_generate = true;
        }
        score += t.weight * count as f32;
    }

    Ok(ReportDecision {
        channel_id: snap.channel_id.clone(),
        should_generate,
        window_counts: snap.window_counts.clone(),
        rank_score: score,
    })
}

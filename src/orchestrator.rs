use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attribution::attribute;
use crate::capabilities::{ImageGenerator, ReportDrafter, SentenceMatcher};
use crate::config::PipelineConfig;
use crate::counter::WindowedCounter;
use crate::distribution::prepare;
use crate::errors::PipelineError;
use crate::models::{Attribution, PreparedDistributionContent, Report, SourceMessage};
use crate::ranker::rank;
use crate::trigger::{select, CooldownState};

/// The external collaborators one cycle drives.
pub struct Capabilities<'a> {
    pub drafter: &'a dyn ReportDrafter,
    pub matcher: &'a dyn SentenceMatcher,
    pub image_gen: &'a dyn ImageGenerator,
}

/// Everything produced for one selected channel: the drafted report, its
/// fully validated attributions, and the platform-ready content.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReportOutcome {
    pub channel_id: String,
    pub report: Report,
    pub attributions: Vec<Attribution>,
    pub content: PreparedDistributionContent,
}

/// Result of one cycle. A channel that fails mid-pipeline lands in
/// `failures` with its error; it does not abort the other channels.
#[derive(Debug)]
pub struct CycleOutcome {
    pub outcomes: Vec<ChannelReportOutcome>,
    pub failures: Vec<(String, PipelineError)>,
}

/// Runs one full pipeline cycle: snapshot every channel, rank, select under
/// cooldown and caps, then draft → attribute → prepare concurrently for each
/// selected channel. `now` is explicit so cycles are reproducible in tests.
pub async fn run_cycle(
    counter: &WindowedCounter,
    cooldowns: &CooldownState,
    caps: &Capabilities<'_>,
    cfg: &PipelineConfig,
    messages_by_channel: &HashMap<String, Vec<SourceMessage>>,
    with_images: bool,
    now: DateTime<Utc>,
) -> Result<CycleOutcome, PipelineError> {
    let cycle_start = std::time::Instant::now();

    // 1) aggregate + rank
    let snapshots = counter.snapshot_all(now);
    debug!("Cycle started - channels={}, now={}", snapshots.len(), now);
    let decisions = rank(&snapshots, &cfg.thresholds)?;
    let qualifying = decisions.iter().filter(|d| d.should_generate).count();
    debug!(
        "Ranking completed - decisions={}, qualifying={}",
        decisions.len(),
        qualifying
    );

    // 2) trigger selection under cooldown + caps
    let selected = select(&decisions, cooldowns, &cfg.trigger, now);
    if selected.is_empty() {
        info!(
            "Cycle completed, nothing to report - qualifying={}, duration={:.2}s",
            qualifying,
            cycle_start.elapsed().as_secs_f32()
        );
        return Ok(CycleOutcome {
            outcomes: Vec::new(),
            failures: Vec::new(),
        });
    }
    info!(
        "Channels selected for reports - selected={}, qualifying={}",
        selected.len(),
        qualifying
    );

    let score_of: HashMap<&str, f32> = decisions
        .iter()
        .map(|d| (d.channel_id.as_str(), d.rank_score))
        .collect();

    // 3) per-channel report pipelines, concurrent across channels
    let tasks: Vec<_> = selected
        .iter()
        .map(|channel_id| {
            let msgs = messages_by_channel
                .get(channel_id)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            let rank_score = score_of.get(channel_id.as_str()).copied();
            run_channel(channel_id, msgs, rank_score, caps, cfg, with_images)
        })
        .collect();
    let results = futures::future::join_all(tasks).await;

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for (channel_id, result) in selected.into_iter().zip(results) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!("Channel pipeline failed - channel={}, error={}", channel_id, e);
                failures.push((channel_id, e));
            }
        }
    }

    info!(
        "Cycle completed - reports={}, failures={}, duration={:.2}s",
        outcomes.len(),
        failures.len(),
        cycle_start.elapsed().as_secs_f32()
    );
    Ok(CycleOutcome { outcomes, failures })
}

/// One channel's pipeline after selection. Attribution must pass in full
/// before any distribution content is produced; a report without complete
/// attribution is never handed to publishing.
async fn run_channel(
    channel_id: &str,
    messages: &[SourceMessage],
    rank_score: Option<f32>,
    caps: &Capabilities<'_>,
    cfg: &PipelineConfig,
    with_images: bool,
) -> Result<ChannelReportOutcome, PipelineError> {
    let start = std::time::Instant::now();

    let report = tokio::time::timeout(cfg.stage_timeout, caps.drafter.draft(channel_id, messages))
        .await
        .map_err(|_| PipelineError::StageTimeout {
            stage: "draft",
            channel_id: channel_id.to_string(),
        })?
        .map_err(|e| PipelineError::CapabilityFailure {
            stage: "draft",
            channel_id: channel_id.to_string(),
            detail: e.to_string(),
        })?;
    debug!(
        "Report drafted - channel={}, report={}, body_length={} chars",
        channel_id,
        report.id,
        report.body.len()
    );

    let attributions = attribute(
        &report,
        messages,
        caps.matcher,
        &cfg.attribution,
        cfg.stage_timeout,
    )
    .await?;

    let content = prepare(
        &report,
        rank_score,
        with_images,
        caps.image_gen,
        &cfg.distribution,
        cfg.stage_timeout,
    )
    .await;

    info!(
        "Channel pipeline completed - channel={}, report={}, attributions={}, duration={:.2}s",
        channel_id,
        report.id,
        attributions.len(),
        start.elapsed().as_secs_f32()
    );

    Ok(ChannelReportOutcome {
        channel_id: channel_id.to_string(),
        report,
        attributions,
        content,
    })
}

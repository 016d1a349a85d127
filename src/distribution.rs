use std::time::Duration;

use itertools::Itertools;
use tracing::warn;

use crate::capabilities::ImageGenerator;
use crate::config::DistributionConfig;
use crate::models::{PreparedDistributionContent, Report};
use crate::sentences::split_sentences;

const ELLIPSIS: char = '\u{2026}';
// below this many leftover characters an excerpt fragment is not worth it
const MIN_EXCERPT_CHARS: usize = 24;

/// Derives platform-ready post content from a report. Text preparation is a
/// pure transformation; the optional image call is best-effort and its
/// failure (or timeout) degrades to `image: None` without touching the text.
pub async fn prepare(
    report: &Report,
    rank_score: Option<f32>,
    with_image: bool,
    image_gen: &dyn ImageGenerator,
    cfg: &DistributionConfig,
    timeout: Duration,
) -> PreparedDistributionContent {
    let fixed_headline = fix_headline(&report.headline, cfg.headline_limit);
    let main_post = compose_main_post(&fixed_headline, &report.body, cfg.post_limit);
    let reply_post = compose_reply_post(report, cfg);
    let is_major_event = report.message_count >= cfg.major_message_count
        || rank_score.is_some_and(|s| s >= cfg.major_rank_score);

    let image = if with_image {
        let city = if report.city.is_empty() {
            None
        } else {
            Some(report.city.as_str())
        };
        match tokio::time::timeout(timeout, image_gen.generate(&fixed_headline, city)).await {
            Ok(Ok(image_ref)) => Some(image_ref),
            Ok(Err(e)) => {
                warn!(
                    "Image generation failed, continuing text-only - report={}, error={}",
                    report.id, e
                );
                None
            }
            Err(_) => {
                warn!(
                    "Image generation timed out, continuing text-only - report={}",
                    report.id
                );
                None
            }
        }
    } else {
        None
    };

    PreparedDistributionContent {
        original_headline: report.headline.clone(),
        fixed_headline,
        main_post,
        reply_post,
        image,
        is_major_event,
    }
}

/// Strips control characters, collapses runs of whitespace, and cuts to the
/// platform headline limit at a word boundary. Deterministic.
pub fn fix_headline(headline: &str, limit: usize) -> String {
    let cleaned: String = headline.chars().filter(|c| !c.is_control()).collect();
    let collapsed = cleaned.split_whitespace().join(" ");
    truncate_at_word(&collapsed, limit)
}

/// Headline plus as much body excerpt as fits the post limit. Truncation
/// prefers whole sentences, falls back to whole words, and never cuts
/// mid-word. Short bodies pass through untouched.
pub fn compose_main_post(fixed_headline: &str, body: &str, post_limit: usize) -> String {
    let headline_len = fixed_headline.chars().count();
    // +2 for the separator newlines; limits that tight leave no room for
    // any excerpt, so the post is the headline alone
    if headline_len + 2 >= post_limit {
        return truncate_at_word(fixed_headline, post_limit);
    }

    let budget = post_limit - headline_len - 2;
    let mut excerpt = String::new();
    for sentence in split_sentences(body) {
        let sep = usize::from(!excerpt.is_empty());
        if excerpt.chars().count() + sep + sentence.chars().count() > budget {
            break;
        }
        if !excerpt.is_empty() {
            excerpt.push(' ');
        }
        excerpt.push_str(&sentence);
    }

    // not even the first sentence fit; take a word-bounded fragment instead
    if excerpt.is_empty() && budget >= MIN_EXCERPT_CHARS {
        if let Some(first) = split_sentences(body).into_iter().next() {
            excerpt = truncate_at_word(&first, budget);
        }
    }

    if excerpt.is_empty() {
        fixed_headline.to_string()
    } else {
        format!("{}\n\n{}", fixed_headline, excerpt)
    }
}

fn compose_reply_post(report: &Report, cfg: &DistributionConfig) -> Option<String> {
    if report.message_count <= cfg.reply_min_messages {
        return None;
    }
    Some(format!(
        "Compiled from {} messages in #{} over {}.",
        report.message_count, report.channel_id, report.timeframe
    ))
}

/// Cuts to `limit` characters at a word boundary, appending an ellipsis when
/// anything was dropped. Only a single token longer than the whole limit is
/// ever hard-cut, since no word boundary exists to cut at.
fn truncate_at_word(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let mut out = String::new();
    let mut out_len = 0usize;
    for word in s.split_whitespace() {
        let wlen = word.chars().count();
        let sep = usize::from(!out.is_empty());
        if out_len + sep + wlen + 1 > limit {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        out_len += sep + wlen;
    }
    if out.is_empty() {
        out = s.chars().take(limit.saturating_sub(1)).collect();
    }
    out.push(ELLIPSIS);
    out
}

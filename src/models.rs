use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-channel message counts over every configured rolling window,
/// taken at one instant. Superseded wholesale by the next cycle's snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelActivitySnapshot {
    pub channel_id: String,
    pub window_counts: BTreeMap<String, u64>, // window name -> count
    pub taken_at: DateTime<Utc>,
}

/// Ranker verdict for one channel. Consumed once by the trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDecision {
    pub channel_id: String,
    pub should_generate: bool,
    pub window_counts: BTreeMap<String, u64>, // counts that justified the verdict
    pub rank_score: f32,
}

/// One raw chat message. The id is an opaque numeric-string token from the
/// chat platform; it is never parsed, truncated, or used as an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMessage {
    pub id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub channel_id: String,
}

/// A drafted news report. Produced by the external drafting capability;
/// read-only from this crate's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub headline: String,
    pub city: String,
    pub body: String,
    pub generated_at: DateTime<Utc>,
    pub channel_id: String,
    pub message_count: u64,
    pub timeframe: String,
}

/// One report sentence mapped back to the message that justifies it.
/// `sentence` is a byte-identical substring of the report body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub id: String,
    pub sentence: String,
    pub source_message_id: String,
    pub confidence: f32, // [0.5, 1.0]
}

/// Untrusted per-sentence answer from the external matching capability.
/// Validated in full before it becomes an [`Attribution`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSentenceMatch {
    pub sentence_text: String,
    pub source_message_id: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

/// Platform-ready post content derived from a report. Recomputed each time;
/// no lifecycle of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedDistributionContent {
    pub original_headline: String,
    pub fixed_headline: String,
    pub main_post: String,
    pub reply_post: Option<String>,
    pub image: Option<ImageRef>,
    pub is_major_event: bool,
}

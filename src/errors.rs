use thiserror::Error;

/// Pipeline failures. Every variant carries enough context (channel id,
/// report id, stage name) for the caller to log and correlate; this crate
/// does not retry or log on the caller's behalf.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("channel '{channel_id}' has no recorded activity")]
    ChannelNotFound { channel_id: String },

    #[error("invalid snapshot for channel '{channel_id}': {detail}")]
    InvalidSnapshot { channel_id: String, detail: String },

    #[error("attribution coverage failed for report '{report_id}': {detail}")]
    IncompleteCoverage { report_id: String, detail: String },

    #[error(
        "confidence {confidence} outside sanity range for report '{report_id}' (sentence: {sentence})"
    )]
    InvalidConfidence {
        report_id: String,
        sentence: String,
        confidence: f32,
    },

    #[error("stage '{stage}' timed out for channel '{channel_id}'")]
    StageTimeout {
        stage: &'static str,
        channel_id: String,
    },

    #[error("stage '{stage}' failed for channel '{channel_id}': {detail}")]
    CapabilityFailure {
        stage: &'static str,
        channel_id: String,
        detail: String,
    },
}

//! Seams for the external collaborators the pipeline drives but does not
//! own: report drafting, sentence matching, and image generation. All three
//! are inference-backed and unreliable; the pipeline bounds every call with
//! a timeout and validates what comes back.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ImageRef, RawSentenceMatch, Report, SourceMessage};

/// Drafts report prose for one channel from its recent messages.
#[async_trait]
pub trait ReportDrafter: Send + Sync {
    async fn draft(&self, channel_id: &str, messages: &[SourceMessage]) -> Result<Report>;
}

/// Maps report sentences to source messages. The request carries full
/// message id strings, never positions; the response is untrusted and goes
/// through coverage validation before use.
#[async_trait]
pub trait SentenceMatcher: Send + Sync {
    async fn match_sentences(
        &self,
        sentences: &[String],
        sources: &[SourceMessage],
    ) -> Result<Vec<RawSentenceMatch>>;
}

/// Produces an illustration for a prompt. Failures degrade to text-only
/// content upstream; they never fail a preparation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, city: Option<&str>) -> Result<ImageRef>;
}

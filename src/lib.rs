//! Activity-triggered report pipeline for chat channels.
//!
//! One cycle runs four stages: the [`counter`] aggregates message volume per
//! channel over rolling windows, the [`ranker`] decides which channels have
//! earned a report, the [`trigger`] enforces cooldowns and per-cycle caps,
//! and for each selected channel an externally drafted report is pushed
//! through sentence [`attribution`] and [`distribution`] preparation. The
//! drafting, matching, and image collaborators live behind the
//! [`capabilities`] traits; this crate owns the policy and the validation,
//! not the inference.

pub mod attribution;
pub mod capabilities;
pub mod config;
pub mod counter;
pub mod distribution;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod ranker;
pub mod sentences;
pub mod trigger;

pub use attribution::attribute;
pub use capabilities::{ImageGenerator, ReportDrafter, SentenceMatcher};
pub use config::{
    ActivityThresholds, AttributionConfig, DistributionConfig, PipelineConfig, TriggerConfig,
    WindowSpec, WindowThreshold,
};
pub use counter::WindowedCounter;
pub use distribution::prepare;
pub use errors::PipelineError;
pub use models::{
    Attribution, ChannelActivitySnapshot, ImageRef, PreparedDistributionContent,
    RawSentenceMatch, Report, ReportDecision, SourceMessage,
};
pub use orchestrator::{run_cycle, Capabilities, ChannelReportOutcome, CycleOutcome};
pub use ranker::rank;
pub use sentences::split_sentences;
pub use trigger::{select, CooldownState};

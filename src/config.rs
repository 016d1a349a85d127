use chrono::Duration;

/// One rolling window the counter aggregates over, e.g. `("5min", 5 minutes)`.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub name: String,
    pub duration: Duration,
}

impl WindowSpec {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// Per-window trigger threshold and rank weight. Shorter windows carry
/// heavier weights so recent bursts outrank slow accumulation.
#[derive(Debug, Clone)]
pub struct WindowThreshold {
    pub window: String,
    pub min_count: u64,
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub struct ActivityThresholds {
    pub windows: Vec<WindowThreshold>,
}

impl ActivityThresholds {
    pub fn knows_window(&self, name: &str) -> bool {
        self.windows.iter().any(|t| t.window == name)
    }
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            windows: vec![
                WindowThreshold {
                    window: "5min".into(),
                    min_count: 8,
                    weight: 6.0,
                },
                WindowThreshold {
                    window: "1h".into(),
                    min_count: 10,
                    weight: 1.0,
                },
                WindowThreshold {
                    window: "6h".into(),
                    min_count: 30,
                    weight: 0.25,
                },
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Minimum elapsed time before the same channel may trigger again.
    pub cooldown: Duration,
    /// Global cap on reports per cycle, applied after the cooldown filter.
    pub max_per_cycle: usize,
    /// How many top-ranked candidates survive into cooldown filtering.
    pub max_candidates: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::minutes(30),
            max_per_cycle: 3,
            max_candidates: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttributionConfig {
    /// Final clamp range for confidence values.
    pub confidence_floor: f32,
    pub confidence_ceiling: f32,
    /// Sanity range checked before clamping; values outside it are rejected
    /// rather than silently pulled in.
    pub sanity_min: f32,
    pub sanity_max: f32,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            confidence_ceiling: 1.0,
            sanity_min: 0.0,
            sanity_max: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// Character limit for the corrected headline.
    pub headline_limit: usize,
    /// Platform character limit for a single post.
    pub post_limit: usize,
    /// A reply post is only emitted above this message count.
    pub reply_min_messages: u64,
    /// Either gate flips `is_major_event`.
    pub major_message_count: u64,
    pub major_rank_score: f32,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            headline_limit: 120,
            post_limit: 280,
            reply_min_messages: 5,
            major_message_count: 50,
            major_rank_score: 120.0,
        }
    }
}

/// Everything the cycle runner needs, passed explicitly. No globals.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub windows: Vec<WindowSpec>,
    pub thresholds: ActivityThresholds,
    pub trigger: TriggerConfig,
    pub attribution: AttributionConfig,
    pub distribution: DistributionConfig,
    /// Bound on every external capability call (draft, match, image).
    pub stage_timeout: std::time::Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            windows: vec![
                WindowSpec::new("5min", Duration::minutes(5)),
                WindowSpec::new("1h", Duration::hours(1)),
                WindowSpec::new("6h", Duration::hours(6)),
            ],
            thresholds: ActivityThresholds::default(),
            trigger: TriggerConfig::default(),
            attribution: AttributionConfig::default(),
            distribution: DistributionConfig::default(),
            stage_timeout: std::time::Duration::from_secs(90),
        }
    }
}

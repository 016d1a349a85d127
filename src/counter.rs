use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::config::WindowSpec;
use crate::errors::PipelineError;
use crate::models::ChannelActivitySnapshot;

/// Message-volume aggregator. Records raw timestamps per channel and derives
/// window counts by re-evaluating them against the window boundary at
/// snapshot time, so counting is a pure function of (history, now) and tests
/// never touch the wall clock.
pub struct WindowedCounter {
    windows: Vec<WindowSpec>,
    history: HashMap<String, Vec<DateTime<Utc>>>,
}

impl WindowedCounter {
    pub fn new(windows: Vec<WindowSpec>) -> Self {
        Self {
            windows,
            history: HashMap::new(),
        }
    }

    pub fn record(&mut self, channel_id: &str, at: DateTime<Utc>) {
        self.history
            .entry(channel_id.to_string())
            .or_default()
            .push(at);
    }

    /// Channel ids with any recorded history, sorted for stable iteration.
    pub fn channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.history.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn counts_for(&self, stamps: &[DateTime<Utc>], now: DateTime<Utc>) -> BTreeMap<String, u64> {
        self.windows
            .iter()
            .map(|w| {
                let floor = now - w.duration;
                let n = stamps.iter().filter(|t| **t >= floor && **t <= now).count() as u64;
                (w.name.clone(), n)
            })
            .collect()
    }

    /// Counts for one channel. Unknown channels read as all-zero activity.
    pub fn snapshot(&self, channel_id: &str, now: DateTime<Utc>) -> ChannelActivitySnapshot {
        let stamps = self
            .history
            .get(channel_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        ChannelActivitySnapshot {
            channel_id: channel_id.to_string(),
            window_counts: self.counts_for(stamps, now),
            taken_at: now,
        }
    }

    /// Like [`snapshot`](Self::snapshot) but an unknown channel is an error
    /// instead of zero activity.
    pub fn snapshot_strict(
        &self,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChannelActivitySnapshot, PipelineError> {
        if !self.history.contains_key(channel_id) {
            return Err(PipelineError::ChannelNotFound {
                channel_id: channel_id.to_string(),
            });
        }
        Ok(self.snapshot(channel_id, now))
    }

    /// Snapshots for every known channel, sorted by channel id.
    pub fn snapshot_all(&self, now: DateTime<Utc>) -> Vec<ChannelActivitySnapshot> {
        self.channels()
            .iter()
            .map(|id| self.snapshot(id, now))
            .collect()
    }

    /// Drops timestamps that no window can see any more. Channels keep their
    /// entry even when emptied, so they stay known to `snapshot_strict`.
    pub fn evict_stale(&mut self, now: DateTime<Utc>) {
        let Some(largest) = self.windows.iter().map(|w| w.duration).max() else {
            return;
        };
        let floor = now - largest;
        for stamps in self.history.values_mut() {
            stamps.retain(|t| *t >= floor);
        }
    }
}

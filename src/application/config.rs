use serde::{Deserialize, Serialize};

use crate::domain::market_data::{
    DEFAULT_BOUNDARY_EPSILON_MS, DEFAULT_MAX_BARS_PER_REQUEST, IntervalChunker,
};

/// Tuning knobs for history acquisition and live polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Provider page limit.
    pub max_bars_per_request: u64,
    /// Polls per bar while streaming, so a forming bar is refreshed before it closes.
    pub polls_per_bar: u32,
    /// Compensates the provider's exclusive end bound.
    pub boundary_epsilon_ms: u64,
    /// How long an error notification stays visible.
    pub notification_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_bars_per_request: DEFAULT_MAX_BARS_PER_REQUEST,
            polls_per_bar: 4,
            boundary_epsilon_ms: DEFAULT_BOUNDARY_EPSILON_MS,
            notification_ms: 5000,
        }
    }
}

impl SyncConfig {
    pub fn chunker(&self) -> IntervalChunker {
        IntervalChunker::new(self.max_bars_per_request, self.boundary_epsilon_ms)
    }
}

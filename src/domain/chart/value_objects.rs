use derive_more::Display;

use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::market_data::{Granularity, Instrument, TimeRange, Timestamp};
use crate::time_utils;

/// Value Object - redraw style requested from the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RedrawMode {
    /// Partial bar revision; the renderer may animate the change.
    #[display(fmt = "Animated")]
    Animated,
    #[display(fmt = "Immediate")]
    Immediate,
}

impl RedrawMode {
    pub fn is_animated(&self) -> bool {
        matches!(self, RedrawMode::Animated)
    }
}

/// Value Object - everything that defines what the chart shows
#[derive(Debug, Clone, PartialEq)]
pub struct ChartParameters {
    pub instrument: Instrument,
    pub granularity: Granularity,
    pub range: TimeRange,
    pub streaming_enabled: bool,
}

impl ChartParameters {
    pub fn new(
        instrument: Instrument,
        granularity: Granularity,
        range: TimeRange,
        streaming_enabled: bool,
    ) -> ChartResult<Self> {
        if range.is_empty() {
            return Err(ChartError::InvalidParameter(format!(
                "Start time {} must be before end time {}",
                range.start, range.end
            )));
        }
        Ok(Self { instrument, granularity, range, streaming_enabled })
    }

    /// `EUR_USD`, `M30`, from today's UTC midnight up to `now_ms`, not streaming.
    pub fn defaults_at(now_ms: u64) -> Self {
        let start = time_utils::midnight_utc(now_ms);
        // Exactly at midnight the day has no history yet; keep the range non-empty.
        let end = now_ms.max(start + 1);
        Self {
            instrument: Instrument::default(),
            granularity: Granularity::default(),
            range: TimeRange { start: Timestamp::from_millis(start), end: Timestamp::from_millis(end) },
            streaming_enabled: false,
        }
    }
}

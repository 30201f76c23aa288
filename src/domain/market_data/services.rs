use crate::domain::errors::ChartResult;
use crate::domain::market_data::{Granularity, TimeRange, Timestamp};

/// Provider page limit for a single history request.
pub const DEFAULT_MAX_BARS_PER_REQUEST: u64 = 5000;

/// Added to right-hand bounds because the provider excludes the end instant.
pub const DEFAULT_BOUNDARY_EPSILON_MS: u64 = 1000;

/// Granularity code -> duration lookup.
pub struct GranularityTable;

impl GranularityTable {
    /// Duration of `code` in seconds; `M` is resolved against `(year, month)`, 1-based.
    pub fn duration_seconds(code: &str, year: i32, month: u32) -> ChartResult<u64> {
        Granularity::from_code(code)?.duration_seconds(year, month)
    }

    /// Every accepted code, shortest bucket first.
    pub fn list_codes() -> Vec<&'static str> {
        Granularity::all().iter().map(|g| g.code()).collect()
    }
}

/// Splits a time range into provider-sized requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalChunker {
    pub max_bars_per_request: u64,
    pub boundary_epsilon_ms: u64,
}

impl Default for IntervalChunker {
    fn default() -> Self {
        Self {
            max_bars_per_request: DEFAULT_MAX_BARS_PER_REQUEST,
            boundary_epsilon_ms: DEFAULT_BOUNDARY_EPSILON_MS,
        }
    }
}

impl IntervalChunker {
    pub fn new(max_bars_per_request: u64, boundary_epsilon_ms: u64) -> Self {
        Self { max_bars_per_request, boundary_epsilon_ms }
    }

    /// Chunk boundaries `[t0, .., tn]`; `t0` is the range start and `tn` is
    /// `range.end + epsilon`. Consecutive pairs are the sub-requests.
    /// An empty or inverted range yields no boundaries.
    pub fn chunk(&self, range: &TimeRange, granularity_seconds: u64) -> Vec<Timestamp> {
        if range.is_empty() {
            return Vec::new();
        }

        let width = granularity_seconds
            .max(1)
            .saturating_mul(1000)
            .saturating_mul(self.max_bars_per_request.max(1));
        let end = range.end.value().saturating_add(self.boundary_epsilon_ms);

        let mut boundaries = vec![range.start];
        let mut cursor = range.start.value();
        // Measured against the extended end so the last chunk never exceeds `width`.
        while end - cursor > width {
            cursor += width;
            boundaries.push(Timestamp::from_millis(cursor));
        }
        boundaries.push(Timestamp::from_millis(end));
        boundaries
    }

    /// Consecutive boundary pairs as ranges.
    pub fn sub_ranges(&self, range: &TimeRange, granularity_seconds: u64) -> Vec<TimeRange> {
        self.chunk(range, granularity_seconds)
            .windows(2)
            .map(|pair| TimeRange { start: pair[0], end: pair[1] })
            .collect()
    }
}

/// Query window bookkeeping for live polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub last_known_timestamp: Timestamp,
    pub next_window_start: Timestamp,
    pub next_window_end: Timestamp,
    pub idle_streak: u32,
}

impl SyncState {
    /// First window: from the last bar to one bucket past it.
    pub fn new(last_known: Timestamp, granularity_ms: u64, epsilon_ms: u64) -> Self {
        let mut state = Self {
            last_known_timestamp: last_known,
            next_window_start: last_known,
            next_window_end: last_known,
            idle_streak: 0,
        };
        state.recompute_window(granularity_ms, epsilon_ms);
        state
    }

    pub fn window(&self) -> TimeRange {
        TimeRange { start: self.next_window_start, end: self.next_window_end }
    }

    /// Fold the result of one poll into the state.
    ///
    /// An idle poll widens the next window by one more bucket; an appended bar
    /// shrinks it back to a single bucket.
    pub fn advance(&mut self, last_known: Timestamp, appended: bool, granularity_ms: u64, epsilon_ms: u64) {
        self.last_known_timestamp = last_known;
        if appended {
            self.idle_streak = 0;
        } else {
            self.idle_streak = self.idle_streak.saturating_add(1);
        }
        self.recompute_window(granularity_ms, epsilon_ms);
    }

    /// Buckets covered by the next window.
    pub fn window_multiplier(&self) -> u64 {
        self.idle_streak as u64 + 1
    }

    fn recompute_window(&mut self, granularity_ms: u64, epsilon_ms: u64) {
        self.next_window_start = self.last_known_timestamp;
        let span = granularity_ms
            .saturating_mul(self.window_multiplier())
            .saturating_add(epsilon_ms);
        self.next_window_end = self.last_known_timestamp.saturating_add_millis(span);
    }
}

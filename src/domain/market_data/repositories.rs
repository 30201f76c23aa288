use crate::domain::errors::ProviderResult;
use crate::domain::market_data::{Candle, Granularity, Instrument, TimeRange};
use strum::{AsRefStr, Display};

/// Price representation requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
pub enum CandleFormat {
    #[default]
    #[strum(serialize = "midpoint")]
    Midpoint,
}

/// One history request: bars of `granularity` in `range`, end exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub instrument: Instrument,
    pub granularity: Granularity,
    pub range: TimeRange,
    pub candle_format: CandleFormat,
    /// Explicitly include a bar starting exactly at `range.start`;
    /// `None` leaves the provider default in place.
    pub include_first: Option<bool>,
}

impl HistoryQuery {
    pub fn new(instrument: Instrument, granularity: Granularity, range: TimeRange) -> Self {
        Self {
            instrument,
            granularity,
            range,
            candle_format: CandleFormat::Midpoint,
            include_first: None,
        }
    }

    pub fn including_first(mut self) -> Self {
        self.include_first = Some(true);
        self
    }
}

/// Source of historical price bars
#[allow(async_fn_in_trait)]
pub trait HistoryProvider {
    /// Bars in ascending time order, or the provider's error.
    async fn history(&self, query: &HistoryQuery) -> ProviderResult<Vec<Candle>>;
}

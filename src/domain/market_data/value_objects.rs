use derive_more::{Constructor, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString, IntoEnumIterator};

use crate::domain::errors::{ChartError, ChartResult};
use crate::time_utils;

/// Value Object - mid price
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Constructor, Serialize, Deserialize)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - epoch milliseconds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Constructor, Display, Serialize, Deserialize,
)]
#[display(fmt = "{}", _0)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn from_millis(value: u64) -> Self {
        Self(value)
    }

    pub fn saturating_add_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

/// Value Object - OHLC midpoint prices
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct Ohlc {
    pub low: Price,
    pub close: Price,
    pub open: Price,
    pub high: Price,
}

impl Ohlc {
    /// Checks OHLC consistency
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Value Object - trading instrument, e.g. `EUR_USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(instrument: &str) -> ChartResult<Self> {
        let trimmed = instrument.trim();
        if trimmed.is_empty() {
            return Err(ChartError::InvalidParameter("Instrument cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self("EUR_USD".to_string())
    }
}

/// Value Object - candle bucket width, declared in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, StrumDisplay, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
pub enum Granularity {
    S5,
    S10,
    S15,
    S30,
    M1,
    M2,
    M3,
    M5,
    M10,
    M15,
    #[default]
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D,
    W,
    /// Calendar month; length depends on the month it starts in.
    M,
}

impl Granularity {
    /// Parse a provider code such as `M30`.
    pub fn from_code(code: &str) -> ChartResult<Self> {
        code.parse::<Granularity>()
            .map_err(|_| ChartError::InvalidGranularity(code.to_string()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::S5 => "S5",
            Self::S10 => "S10",
            Self::S15 => "S15",
            Self::S30 => "S30",
            Self::M1 => "M1",
            Self::M2 => "M2",
            Self::M3 => "M3",
            Self::M5 => "M5",
            Self::M10 => "M10",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H6 => "H6",
            Self::H8 => "H8",
            Self::H12 => "H12",
            Self::D => "D",
            Self::W => "W",
            Self::M => "M",
        }
    }

    /// Fixed duration in seconds; `None` for the calendar month.
    pub fn fixed_seconds(&self) -> Option<u64> {
        let secs = match self {
            Self::S5 => 5,
            Self::S10 => 10,
            Self::S15 => 15,
            Self::S30 => 30,
            Self::M1 => 60,
            Self::M2 => 120,
            Self::M3 => 180,
            Self::M5 => 300,
            Self::M10 => 600,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H2 => 7200,
            Self::H3 => 10800,
            Self::H4 => 14400,
            Self::H6 => 21600,
            Self::H8 => 28800,
            Self::H12 => 43200,
            Self::D => 86400,
            Self::W => 604800,
            Self::M => return None,
        };
        Some(secs)
    }

    /// Duration in seconds, resolving `M` against `(year, month)` with 1-based months.
    pub fn duration_seconds(&self, year: i32, month: u32) -> ChartResult<u64> {
        match self.fixed_seconds() {
            Some(secs) => Ok(secs),
            None => {
                let days = time_utils::days_in_month(year, month).ok_or_else(|| {
                    ChartError::InvalidParameter(format!("No such month: {}-{}", year, month))
                })?;
                Ok(days as u64 * 86_400)
            }
        }
    }

    /// Duration resolved against the calendar month containing `at`.
    pub fn duration_seconds_at(&self, at: Timestamp) -> ChartResult<u64> {
        let (year, month) = time_utils::year_month_of(at.value())
            .ok_or_else(|| ChartError::InvalidParameter(format!("Timestamp out of range: {}", at)))?;
        self.duration_seconds(year, month)
    }

    pub fn all() -> Vec<Granularity> {
        Granularity::iter().collect()
    }
}

/// Value Object - time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Validated constructor; `start` must be strictly before `end`.
    pub fn new(start: Timestamp, end: Timestamp) -> ChartResult<Self> {
        if start >= end {
            return Err(ChartError::InvalidParameter(format!(
                "Start time {} must be before end time {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration_ms(&self) -> u64 {
        self.end.value().saturating_sub(self.start.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_codes_round_trip_through_from_str() {
        for granularity in Granularity::all() {
            assert_eq!(Granularity::from_code(granularity.code()).unwrap(), granularity);
            assert_eq!(granularity.as_ref(), granularity.code());
        }
    }

    #[test]
    fn unknown_code_is_invalid_granularity() {
        assert_eq!(
            Granularity::from_code("BOGUS"),
            Err(ChartError::InvalidGranularity("BOGUS".to_string()))
        );
        assert!(Granularity::from_code("m30").is_err());
    }

    #[test]
    fn instrument_is_trimmed_and_uppercased() {
        assert_eq!(Instrument::new(" eur_usd ").unwrap().value(), "EUR_USD");
        assert!(Instrument::new("   ").is_err());
    }

    #[test]
    fn time_range_rejects_inverted_bounds() {
        assert!(TimeRange::new(Timestamp::from_millis(10), Timestamp::from_millis(10)).is_err());
        assert!(TimeRange::new(Timestamp::from_millis(11), Timestamp::from_millis(10)).is_err());
        let range = TimeRange::new(Timestamp::from_millis(10), Timestamp::from_millis(15)).unwrap();
        assert_eq!(range.duration_ms(), 5);
    }
}

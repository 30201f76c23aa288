pub use super::value_objects::{Ohlc, Price, Timestamp};
use crate::domain::errors::{ChartError, ChartResult};
use serde::{Deserialize, Serialize};

/// Domain entity - Candle. Identity is `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    pub ohlc: Ohlc,
}

impl Candle {
    pub fn new(timestamp: Timestamp, ohlc: Ohlc) -> Self {
        Self { timestamp, ohlc }
    }
}

/// How a live candle was merged into the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Same timestamp as the last bar; its prices were replaced.
    Revised,
    Appended,
}

/// Domain entity - Candle series.
///
/// Strictly increasing by timestamp. The only legal mutations are appending a
/// newer candle and replacing the prices of the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self { candles: Vec::new() }
    }

    /// Append a candle newer than the current last one.
    pub fn append(&mut self, candle: Candle) -> ChartResult<()> {
        if let Some(last) = self.candles.last() {
            if candle.timestamp <= last.timestamp {
                return Err(ChartError::SeriesCorruption(format!(
                    "candle at {} does not follow last candle at {}",
                    candle.timestamp, last.timestamp
                )));
            }
        }
        self.candles.push(candle);
        Ok(())
    }

    /// Replace the prices of the last candle; timestamps must match.
    pub fn replace_last(&mut self, candle: Candle) -> ChartResult<()> {
        match self.candles.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                last.ohlc = candle.ohlc;
                Ok(())
            }
            Some(last) => Err(ChartError::SeriesCorruption(format!(
                "revision at {} does not match last candle at {}",
                candle.timestamp, last.timestamp
            ))),
            None => Err(ChartError::SeriesCorruption(format!(
                "revision at {} for an empty series",
                candle.timestamp
            ))),
        }
    }

    /// Merge a polled candle: revise the last bar or append a new one.
    /// Anything older than the last bar is rejected.
    pub fn merge_live(&mut self, candle: Candle) -> ChartResult<MergeKind> {
        match self.candles.last() {
            Some(last) if last.timestamp == candle.timestamp => {
                self.replace_last(candle)?;
                Ok(MergeKind::Revised)
            }
            _ => {
                self.append(candle)?;
                Ok(MergeKind::Appended)
            }
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn count(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Timestamp of the last candle
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.candles.last().map(|c| c.timestamp)
    }
}

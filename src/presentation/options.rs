use serde::{Deserialize, Serialize};

use crate::application::SyncConfig;
use crate::domain::{
    chart::ChartParameters,
    errors::{ChartError, ChartResult},
    market_data::{Granularity, Instrument, TimeRange, Timestamp},
};
use crate::infrastructure::{DEFAULT_CONTAINER_ID, ProviderConfig};

/// Options object accepted by the chart constructor.
///
/// Every field is optional; missing ones fall back to `EUR_USD`, `M30`,
/// today's UTC midnight up to now, streaming off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartOptions {
    pub instrument: Option<String>,
    pub granularity: Option<String>,
    /// Epoch milliseconds
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub streaming: bool,
    pub notification_container: Option<String>,
    pub sync: SyncConfig,
    pub api: ProviderConfig,
}

impl ChartOptions {
    pub fn from_json(json: &str) -> ChartResult<Self> {
        serde_json::from_str(json).map_err(|e| ChartError::InvalidParameter(format!("chart options: {}", e)))
    }

    pub fn container_id(&self) -> &str {
        self.notification_container.as_deref().unwrap_or(DEFAULT_CONTAINER_ID)
    }

    /// Initial parameters at `now_ms`.
    pub fn parameters(&self, now_ms: u64) -> ChartResult<ChartParameters> {
        let defaults = ChartParameters::defaults_at(now_ms);

        let instrument = match &self.instrument {
            Some(symbol) => Instrument::new(symbol)?,
            None => defaults.instrument,
        };
        let granularity = match &self.granularity {
            Some(code) => Granularity::from_code(code)?,
            None => defaults.granularity,
        };
        let range = TimeRange {
            start: self.start_time.map(Timestamp::from_millis).unwrap_or(defaults.range.start),
            end: self.end_time.map(Timestamp::from_millis).unwrap_or(defaults.range.end),
        };

        ChartParameters::new(instrument, granularity, range, self.streaming)
    }
}

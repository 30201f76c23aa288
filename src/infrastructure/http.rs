use futures::future::{Either, select};
use gloo::net::http::Request;
use gloo_timers::future::TimeoutFuture;
use serde::{Deserialize, Serialize};

use crate::domain::{
    errors::{ProviderError, ProviderResult},
    logging::LogComponent,
    market_data::{Candle, HistoryProvider, HistoryQuery, Ohlc, Price, Timestamp},
};
use crate::time_utils;
use crate::{log_debug, log_warn};

pub const DEFAULT_BASE_URL: &str = "https://api-fxtrade.oanda.com";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 30_000;

/// Connection settings for the candles endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub access_token: Option<String>,
    pub request_timeout_ms: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ProviderConfig {
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Candle time: RFC3339 text or Unix microseconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CandleTimeDto {
    Micros(u64),
    Text(String),
}

impl CandleTimeDto {
    fn to_millis(&self) -> Option<u64> {
        match self {
            CandleTimeDto::Micros(us) => Some(us / 1000),
            CandleTimeDto::Text(raw) => time_utils::parse_candle_time(raw),
        }
    }
}

/// Midpoint candle as sent by the provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidpointCandleDto {
    pub time: CandleTimeDto,
    pub open_mid: f64,
    pub high_mid: f64,
    pub low_mid: f64,
    pub close_mid: f64,
    #[serde(default)]
    pub complete: Option<bool>,
}

impl MidpointCandleDto {
    pub fn to_domain(&self) -> ProviderResult<Candle> {
        let millis = self
            .time
            .to_millis()
            .ok_or_else(|| ProviderError::ParseError(format!("bad candle time {:?}", self.time)))?;

        let ohlc = Ohlc::new(
            Price::from(self.low_mid),
            Price::from(self.close_mid),
            Price::from(self.open_mid),
            Price::from(self.high_mid),
        );
        if !ohlc.is_valid() {
            return Err(ProviderError::ParseError(format!("inconsistent prices at {}", millis)));
        }

        Ok(Candle::new(Timestamp::from_millis(millis), ohlc))
    }
}

/// Body of a candles response; errors share the same envelope.
#[derive(Debug, Deserialize)]
struct CandlesEnvelope {
    #[serde(default)]
    candles: Option<Vec<MidpointCandleDto>>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode a response body into domain candles.
pub fn parse_candles(body: &str) -> ProviderResult<Vec<Candle>> {
    let envelope: CandlesEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    match envelope {
        CandlesEnvelope { candles: Some(candles), .. } => {
            candles.iter().map(MidpointCandleDto::to_domain).collect()
        }
        CandlesEnvelope { message: Some(message), code, .. } => Err(ProviderError::Api { code, message }),
        _ => Err(ProviderError::ParseError("response has neither candles nor an error".to_string())),
    }
}

/// Price history over the `v1/candles` endpoint
#[derive(Debug, Clone)]
pub struct OandaHttpClient {
    config: ProviderConfig,
}

impl Default for OandaHttpClient {
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

impl OandaHttpClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn candles_url(&self) -> String {
        format!("{}/v1/candles", self.config.base_url.trim_end_matches('/'))
    }

    /// Query string for one history request
    pub fn query_params(query: &HistoryQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("instrument", query.instrument.value().to_string()),
            ("granularity", query.granularity.code().to_string()),
            ("start", time_utils::format_rfc3339(query.range.start.value())),
            ("end", time_utils::format_rfc3339(query.range.end.value())),
            ("candleFormat", query.candle_format.to_string()),
        ];
        if let Some(include_first) = query.include_first {
            params.push(("includeFirst", include_first.to_string()));
        }
        params
    }

    async fn fetch(&self, query: &HistoryQuery) -> ProviderResult<Vec<Candle>> {
        let url = self.candles_url();
        let params = Self::query_params(query);
        log_debug!(
            LogComponent::Infrastructure("OandaHttpClient"),
            {
                instrument = query.instrument,
                granularity = query.granularity,
                start = query.range.start,
                end = query.range.end,
                include_first = query.include_first.unwrap_or(false),
            },
            "📡 GET {}",
            url
        );

        let mut request = Request::get(&url).query(params.iter().map(|(k, v)| (*k, v.as_str())));
        if let Some(token) = &self.config.access_token {
            request = request.header("Authorization", &format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("{:?}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(format!("{:?}", e)))?;

        if !response.ok() {
            return Err(match parse_candles(&body) {
                Err(api @ ProviderError::Api { .. }) => api,
                _ => ProviderError::Api {
                    code: Some(i64::from(status)),
                    message: response.status_text(),
                },
            });
        }

        parse_candles(&body)
    }
}

impl HistoryProvider for OandaHttpClient {
    async fn history(&self, query: &HistoryQuery) -> ProviderResult<Vec<Candle>> {
        let timeout_ms = self.config.request_timeout_ms;
        let request = Box::pin(self.fetch(query));
        let timeout = TimeoutFuture::new(timeout_ms);

        match select(request, timeout).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => {
                log_warn!(
                    LogComponent::Infrastructure("OandaHttpClient"),
                    "⏱️ {} {} timed out after {} ms",
                    query.instrument,
                    query.granularity,
                    timeout_ms
                );
                Err(ProviderError::Timeout(timeout_ms))
            }
        }
    }
}

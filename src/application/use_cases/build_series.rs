use std::rc::Rc;

use crate::application::scheduler::GenerationToken;
use crate::domain::{
    errors::{ChartResult, ProviderError},
    logging::LogComponent,
    market_data::{
        CandleSeries, Granularity, HistoryProvider, HistoryQuery, Instrument, IntervalChunker, TimeRange,
    },
};
use crate::{log_debug, log_info, log_warn};

/// Outcome of a historical build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub series: CandleSeries,
    pub chunks_total: usize,
    pub chunks_fetched: usize,
    /// Set when the provider failed; `series` then holds what arrived before.
    pub provider_error: Option<ProviderError>,
    /// A newer generation took over before the build finished.
    pub superseded: bool,
}

impl BuildReport {
    fn empty(chunks_total: usize) -> Self {
        Self {
            series: CandleSeries::new(),
            chunks_total,
            chunks_fetched: 0,
            provider_error: None,
            superseded: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.provider_error.is_none() && !self.superseded && self.chunks_fetched == self.chunks_total
    }
}

/// Use Case: fetch a whole time range chunk by chunk into one series
pub struct SeriesBuilder<P: HistoryProvider> {
    provider: Rc<P>,
    chunker: IntervalChunker,
    generation: Option<GenerationToken>,
}

impl<P: HistoryProvider> SeriesBuilder<P> {
    pub fn new(provider: Rc<P>, chunker: IntervalChunker) -> Self {
        Self { provider, chunker, generation: None }
    }

    /// Stop issuing requests once `token` is no longer current.
    pub fn with_generation(mut self, token: GenerationToken) -> Self {
        self.generation = Some(token);
        self
    }

    /// Fetch every chunk in ascending order and append the bars.
    ///
    /// Best effort: a provider error ends the build with the partial series.
    /// Only an ordering violation is returned as an error.
    pub async fn build(
        &self,
        instrument: &Instrument,
        granularity: Granularity,
        range: TimeRange,
    ) -> ChartResult<BuildReport> {
        if range.is_empty() {
            return Ok(BuildReport::empty(0));
        }

        let granularity_seconds = granularity.duration_seconds_at(range.start)?;
        let chunks = self.chunker.sub_ranges(&range, granularity_seconds);
        let mut report = BuildReport::empty(chunks.len());

        log_info!(
            LogComponent::Application("SeriesBuilder"),
            "📡 Loading {} {} from {} to {} in {} request(s)",
            instrument,
            granularity,
            range.start,
            range.end,
            chunks.len()
        );

        for chunk in chunks {
            let query = HistoryQuery::new(instrument.clone(), granularity, chunk);
            let response = self.provider.history(&query).await;

            if self.is_superseded() {
                log_debug!(
                    LogComponent::Application("SeriesBuilder"),
                    "Build for {} superseded after {} chunk(s)",
                    instrument,
                    report.chunks_fetched
                );
                report.superseded = true;
                return Ok(report);
            }

            match response {
                Ok(candles) => {
                    for candle in candles {
                        report.series.append(candle)?;
                    }
                    report.chunks_fetched += 1;
                }
                Err(e) => {
                    log_warn!(
                        LogComponent::Application("SeriesBuilder"),
                        "❌ Chunk {}..{} failed, keeping {} candles: {}",
                        chunk.start,
                        chunk.end,
                        report.series.count(),
                        e
                    );
                    report.provider_error = Some(e);
                    return Ok(report);
                }
            }
        }

        log_info!(
            LogComponent::Application("SeriesBuilder"),
            "✅ Loaded {} candles for {}",
            report.series.count(),
            instrument
        );

        Ok(report)
    }

    fn is_superseded(&self) -> bool {
        self.generation.as_ref().is_some_and(|token| !token.is_current())
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use crate::application::{
    config::SyncConfig,
    scheduler::{GenerationCounter, GenerationToken, TimerFacility},
    use_cases::{LiveSyncHandle, LiveSyncLoop, SeriesBuilder},
};
use crate::domain::{
    chart::{ChartParameters, ChartRenderer, ErrorNotifier, RedrawMode},
    errors::{ChartError, ChartResult, ProviderError},
    logging::{LogComponent, TimeProvider},
    market_data::{CandleSeries, Granularity, HistoryProvider, Instrument, SyncState, TimeRange, Timestamp},
};
use crate::time_utils::TimeParams;
use crate::{log_info, log_warn};

/// Collaborators a session talks to
pub struct SessionPorts<P: HistoryProvider> {
    pub provider: Rc<P>,
    pub renderer: Rc<dyn ChartRenderer>,
    pub notifier: Rc<dyn ErrorNotifier>,
    pub timer: Rc<dyn TimerFacility>,
    pub clock: Rc<dyn TimeProvider>,
}

impl<P: HistoryProvider> Clone for SessionPorts<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            renderer: self.renderer.clone(),
            notifier: self.notifier.clone(),
            timer: self.timer.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Result of one rebuild
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub candles: usize,
    pub streaming: bool,
    /// The history is partial because the provider failed.
    pub provider_error: Option<ProviderError>,
    /// A later parameter change took over; nothing was applied.
    pub superseded: bool,
}

impl RenderOutcome {
    fn superseded() -> Self {
        Self { candles: 0, streaming: false, provider_error: None, superseded: true }
    }
}

struct SessionState {
    params: ChartParameters,
    series: Rc<RefCell<CandleSeries>>,
    live: Option<LiveSyncHandle>,
}

struct SessionInner<P: HistoryProvider> {
    ports: SessionPorts<P>,
    config: SyncConfig,
    generations: GenerationCounter,
    state: RefCell<SessionState>,
}

/// Orchestrator: owns the chart parameters and drives stop-rebuild-restart.
///
/// Cheap to clone; clones share the same session.
pub struct ChartSession<P: HistoryProvider> {
    inner: Rc<SessionInner<P>>,
}

impl<P: HistoryProvider> Clone for ChartSession<P> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<P: HistoryProvider + 'static> ChartSession<P> {
    /// Session with the default parameters at the clock's current time.
    pub fn new(ports: SessionPorts<P>, config: SyncConfig) -> Self {
        let params = ChartParameters::defaults_at(ports.clock.current_timestamp());
        Self::with_parameters(ports, config, params)
    }

    pub fn with_parameters(ports: SessionPorts<P>, config: SyncConfig, params: ChartParameters) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                ports,
                config,
                generations: GenerationCounter::new(),
                state: RefCell::new(SessionState {
                    params,
                    series: Rc::new(RefCell::new(CandleSeries::new())),
                    live: None,
                }),
            }),
        }
    }

    /// Rebuild the series for the current parameters, draw it, and start
    /// streaming when enabled.
    pub async fn render(&self) -> ChartResult<RenderOutcome> {
        self.rebuild(self.params()).await
    }

    /// On a corrupt rebuild the session goes back to `previous` and resumes
    /// streaming on the series it still holds.
    async fn rebuild(&self, previous: ChartParameters) -> ChartResult<RenderOutcome> {
        let params = self.params();
        self.stop_live();
        let token = self.inner.generations.advance();

        let builder = SeriesBuilder::new(self.inner.ports.provider.clone(), self.inner.config.chunker())
            .with_generation(token.clone());
        let report = match builder.build(&params.instrument, params.granularity, params.range).await {
            Ok(report) => report,
            Err(e) => {
                if token.is_current() {
                    self.notify(&e);
                    self.roll_back(previous, token);
                }
                return Err(e);
            }
        };

        if report.superseded || !token.is_current() {
            return Ok(RenderOutcome::superseded());
        }

        if let Some(e) = &report.provider_error {
            self.notify(&ChartError::Provider(e.clone()));
        }

        let series = Rc::new(RefCell::new(report.series));
        self.inner.ports.renderer.draw(&series.borrow(), RedrawMode::Immediate);

        let live = if params.streaming_enabled {
            self.start_live(&params, series.clone(), token)
        } else {
            None
        };

        let outcome = RenderOutcome {
            candles: series.borrow().count(),
            streaming: live.is_some(),
            provider_error: report.provider_error,
            superseded: false,
        };

        let mut state = self.inner.state.borrow_mut();
        state.series = series;
        state.live = live;

        Ok(outcome)
    }

    /// Stop streaming, supersede in-flight work and clear the chart.
    /// Parameters are kept.
    pub fn reset(&self) {
        self.stop_live();
        self.inner.generations.advance();
        self.inner.ports.renderer.clear();
        self.inner.state.borrow_mut().series = Rc::new(RefCell::new(CandleSeries::new()));
        log_info!(LogComponent::Application("ChartSession"), "🧹 Chart reset");
    }

    pub async fn set_granularity(&self, code: &str) -> ChartResult<RenderOutcome> {
        let granularity = Granularity::from_code(code);
        let previous = self.update_params(|current| {
            let mut next = current.clone();
            next.granularity = granularity?;
            Ok(next)
        })?;
        self.rebuild(previous).await
    }

    pub async fn set_instrument(&self, symbol: &str) -> ChartResult<RenderOutcome> {
        let instrument = Instrument::new(symbol);
        let previous = self.update_params(|current| {
            let mut next = current.clone();
            next.instrument = instrument?;
            Ok(next)
        })?;
        self.rebuild(previous).await
    }

    /// Overlay the given calendar fields on the current start time.
    pub async fn set_start_time(&self, time: TimeParams) -> ChartResult<RenderOutcome> {
        let previous = self.update_params(|current| {
            let start = resolve_time(&time, current.range.start)?;
            with_range(current, TimeRange { start, end: current.range.end }, current.streaming_enabled)
        })?;
        self.rebuild(previous).await
    }

    /// Overlay the given calendar fields on the current end time.
    pub async fn set_end_time(&self, time: TimeParams) -> ChartResult<RenderOutcome> {
        let previous = self.update_params(|current| {
            let end = resolve_time(&time, current.range.end)?;
            with_range(current, TimeRange { start: current.range.start, end }, current.streaming_enabled)
        })?;
        self.rebuild(previous).await
    }

    /// Switch streaming and move the end of the range to now.
    pub async fn toggle_streaming(&self, enabled: bool) -> ChartResult<RenderOutcome> {
        let now = Timestamp::from_millis(self.inner.ports.clock.current_timestamp());
        let previous = self.update_params(|current| {
            with_range(current, TimeRange { start: current.range.start, end: now }, enabled)
        })?;
        self.rebuild(previous).await
    }

    pub fn params(&self) -> ChartParameters {
        self.inner.state.borrow().params.clone()
    }

    pub fn series(&self) -> CandleSeries {
        self.inner.state.borrow().series.borrow().clone()
    }

    pub fn candle_count(&self) -> usize {
        self.inner.state.borrow().series.borrow().count()
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.state.borrow().live.as_ref().is_some_and(|live| live.is_running())
    }

    /// Window bookkeeping of the running loop, if any.
    pub fn sync_state(&self) -> Option<SyncState> {
        let state = self.inner.state.borrow();
        state.live.as_ref().filter(|live| live.is_running()).map(|live| live.sync_state())
    }

    pub fn generation(&self) -> u64 {
        self.inner.generations.current()
    }

    /// Validate and store new parameters, returning the replaced ones. On
    /// failure the user is notified and nothing changes.
    fn update_params<F>(&self, change: F) -> ChartResult<ChartParameters>
    where
        F: FnOnce(&ChartParameters) -> ChartResult<ChartParameters>,
    {
        let candidate = change(&self.inner.state.borrow().params);
        match candidate {
            Ok(params) => Ok(std::mem::replace(&mut self.inner.state.borrow_mut().params, params)),
            Err(e) => {
                log_warn!(LogComponent::Application("ChartSession"), "Rejected change: {}", e);
                self.notify(&e);
                Err(e)
            }
        }
    }

    fn roll_back(&self, previous: ChartParameters, token: GenerationToken) {
        log_warn!(
            LogComponent::Application("ChartSession"),
            "Rebuild failed, keeping {} {}",
            previous.instrument,
            previous.granularity
        );
        let series = self.inner.state.borrow().series.clone();
        let live = if previous.streaming_enabled {
            self.start_live(&previous, series, token)
        } else {
            None
        };
        let mut state = self.inner.state.borrow_mut();
        state.params = previous;
        state.live = live;
    }

    fn start_live(
        &self,
        params: &ChartParameters,
        series: Rc<RefCell<CandleSeries>>,
        token: GenerationToken,
    ) -> Option<LiveSyncHandle> {
        if series.borrow().is_empty() {
            log_warn!(
                LogComponent::Application("ChartSession"),
                "No candles for {} {}, streaming not started",
                params.instrument,
                params.granularity
            );
            return None;
        }

        let ports = &self.inner.ports;
        let live = LiveSyncLoop::new(
            ports.provider.clone(),
            params.instrument.clone(),
            params.granularity,
            series,
            self.inner.config,
            token,
        );
        match live {
            Ok(live) => {
                let live = live.with_renderer(ports.renderer.clone()).with_notifier(ports.notifier.clone());
                Some(live.start(ports.timer.clone(), ports.clock.current_timestamp()))
            }
            Err(e) => {
                self.notify(&e);
                None
            }
        }
    }

    fn stop_live(&self) {
        let live = self.inner.state.borrow_mut().live.take();
        if let Some(live) = live {
            live.stop();
        }
    }

    fn notify(&self, error: &ChartError) {
        self.inner.ports.notifier.notify_error(&error.to_string(), error.kind());
    }
}

fn resolve_time(time: &TimeParams, base: Timestamp) -> ChartResult<Timestamp> {
    time.resolve(base.value())
        .map(Timestamp::from_millis)
        .ok_or_else(|| ChartError::InvalidParameter(format!("{:?} is not a valid date", time)))
}

fn with_range(current: &ChartParameters, range: TimeRange, streaming: bool) -> ChartResult<ChartParameters> {
    ChartParameters::new(current.instrument.clone(), current.granularity, range, streaming)
}

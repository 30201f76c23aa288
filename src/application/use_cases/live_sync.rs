use futures::FutureExt;
use futures::future::{AbortHandle, Abortable};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::application::config::SyncConfig;
use crate::application::scheduler::{GenerationToken, TimerFacility};
use crate::domain::{
    chart::{ChartRenderer, ErrorNotifier, RedrawMode},
    errors::{ChartError, ChartResult},
    logging::LogComponent,
    market_data::{
        Candle, CandleSeries, Granularity, HistoryProvider, HistoryQuery, Instrument, MergeKind,
        SyncState,
    },
};
use crate::time_utils;
use crate::{log_debug, log_error, log_info, log_warn};

/// Lifecycle of a live sync loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Created, not started.
    Idle,
    /// Waiting for the next tick.
    Scheduled,
    /// A poll is in flight.
    Polling,
    Stopped,
}

/// What one poll did to the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Merged { revised: usize, appended: usize },
    /// Provider failed; state untouched.
    Skipped,
    /// Response arrived for a stopped or superseded loop and was dropped.
    Discarded,
    /// Out-of-order bar; the loop is stopped.
    Corrupted,
}

/// First tick lands just after the next bar boundary.
pub fn initial_delay(now_ms: u64, granularity_ms: u64, epsilon_ms: u64) -> Duration {
    let boundary = time_utils::ceil_to_multiple(now_ms, granularity_ms);
    Duration::from_millis(boundary - now_ms + epsilon_ms)
}

pub fn poll_period(granularity_ms: u64, polls_per_bar: u32) -> Duration {
    Duration::from_millis((granularity_ms / u64::from(polls_per_bar.max(1))).max(1))
}

/// Use Case: keep a finished series in step with the provider
pub struct LiveSyncLoop<P: HistoryProvider> {
    provider: Rc<P>,
    renderer: Option<Rc<dyn ChartRenderer>>,
    notifier: Option<Rc<dyn ErrorNotifier>>,
    instrument: Instrument,
    granularity: Granularity,
    granularity_ms: u64,
    config: SyncConfig,
    series: Rc<RefCell<CandleSeries>>,
    state: Rc<Cell<SyncState>>,
    phase: Rc<Cell<LoopPhase>>,
    token: GenerationToken,
}

impl<P: HistoryProvider> LiveSyncLoop<P> {
    /// The bar duration is resolved against the month of the last bar.
    pub fn new(
        provider: Rc<P>,
        instrument: Instrument,
        granularity: Granularity,
        series: Rc<RefCell<CandleSeries>>,
        config: SyncConfig,
        token: GenerationToken,
    ) -> ChartResult<Self> {
        let last = series.borrow().last_timestamp().ok_or_else(|| {
            ChartError::InvalidParameter("live sync needs a non-empty series".to_string())
        })?;
        let granularity_ms = granularity.duration_seconds_at(last)? * 1000;
        let state = SyncState::new(last, granularity_ms, config.boundary_epsilon_ms);

        Ok(Self {
            provider,
            renderer: None,
            notifier: None,
            instrument,
            granularity,
            granularity_ms,
            config,
            series,
            state: Rc::new(Cell::new(state)),
            phase: Rc::new(Cell::new(LoopPhase::Idle)),
            token,
        })
    }

    pub fn with_renderer(mut self, renderer: Rc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn ErrorNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn sync_state(&self) -> SyncState {
        self.state.get()
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase.get()
    }

    pub fn granularity_ms(&self) -> u64 {
        self.granularity_ms
    }

    /// One poll of the window after the last known bar.
    pub async fn tick(&self) -> TickOutcome {
        if !self.is_live() {
            return TickOutcome::Discarded;
        }

        let window = self.state.get().window();
        let query =
            HistoryQuery::new(self.instrument.clone(), self.granularity, window).including_first();
        log_debug!(
            LogComponent::Application("LiveSync"),
            {
                window_start = window.start,
                window_end = window.end,
                idle_streak = self.state.get().idle_streak,
            },
            "🔄 Polling {} {}",
            self.instrument,
            self.granularity
        );

        self.phase.set(LoopPhase::Polling);
        let response = self.provider.history(&query).await;

        if !self.is_live() {
            log_debug!(
                LogComponent::Application("LiveSync"),
                "Dropping poll response for a stopped loop"
            );
            return TickOutcome::Discarded;
        }
        self.phase.set(LoopPhase::Scheduled);

        match response {
            Ok(candles) => self.merge(candles),
            Err(e) => {
                log_warn!(
                    LogComponent::Application("LiveSync"),
                    "⚠️ Poll failed, keeping schedule: {}",
                    e
                );
                TickOutcome::Skipped
            }
        }
    }

    fn merge(&self, candles: Vec<Candle>) -> TickOutcome {
        let mut revised = 0;
        let mut appended = 0;

        for candle in candles {
            let merged = self.series.borrow_mut().merge_live(candle);
            match merged {
                Ok(MergeKind::Revised) => {
                    revised += 1;
                    self.draw(RedrawMode::Animated);
                    // The draw callback may have reset or reconfigured the chart.
                    if !self.is_live() {
                        return TickOutcome::Discarded;
                    }
                }
                Ok(MergeKind::Appended) => appended += 1,
                Err(e) => {
                    self.phase.set(LoopPhase::Stopped);
                    log_error!(
                        LogComponent::Application("LiveSync"),
                        "❌ Live sync stopped: {}",
                        e
                    );
                    if let Some(notifier) = &self.notifier {
                        notifier.notify_error(&e.to_string(), e.kind());
                    }
                    return TickOutcome::Corrupted;
                }
            }
        }

        if appended > 0 {
            self.draw(RedrawMode::Immediate);
            if !self.is_live() {
                return TickOutcome::Discarded;
            }
        }

        let last = self.series.borrow().last_timestamp();
        if let Some(last) = last {
            let mut state = self.state.get();
            state.advance(last, appended > 0, self.granularity_ms, self.config.boundary_epsilon_ms);
            self.state.set(state);
        }

        TickOutcome::Merged { revised, appended }
    }

    fn draw(&self, mode: RedrawMode) {
        if let Some(renderer) = &self.renderer {
            renderer.draw(&self.series.borrow(), mode);
        }
    }

    fn is_live(&self) -> bool {
        if !self.token.is_current() {
            self.phase.set(LoopPhase::Stopped);
        }
        self.phase.get() != LoopPhase::Stopped
    }
}

impl<P: HistoryProvider + 'static> LiveSyncLoop<P> {
    /// Spawn the loop: wait for the next bar boundary, then poll every
    /// `granularity / polls_per_bar`. Each tick finishes before the next sleep.
    pub fn start(self, timer: Rc<dyn TimerFacility>, now_ms: u64) -> LiveSyncHandle {
        let delay = initial_delay(now_ms, self.granularity_ms, self.config.boundary_epsilon_ms);
        let period = poll_period(self.granularity_ms, self.config.polls_per_bar);

        log_info!(
            LogComponent::Application("LiveSync"),
            "▶️ Streaming {} {}: first poll in {:?}, then every {:?}",
            self.instrument,
            self.granularity,
            delay,
            period
        );

        let (abort, registration) = AbortHandle::new_pair();
        let handle = LiveSyncHandle {
            abort,
            phase: self.phase.clone(),
            state: self.state.clone(),
            series: self.series.clone(),
        };

        self.phase.set(LoopPhase::Scheduled);
        let sleeper = timer.clone();
        let task = async move {
            sleeper.sleep(delay).await;
            while self.is_live() {
                self.tick().await;
                if !self.is_live() {
                    break;
                }
                sleeper.sleep(period).await;
            }
        };

        timer.spawn_local(
            async move {
                let _ = Abortable::new(task, registration).await;
            }
            .boxed_local(),
        );

        handle
    }
}

/// Owner's view of a running loop
#[derive(Debug)]
pub struct LiveSyncHandle {
    abort: AbortHandle,
    phase: Rc<Cell<LoopPhase>>,
    state: Rc<Cell<SyncState>>,
    series: Rc<RefCell<CandleSeries>>,
}

impl LiveSyncHandle {
    /// Cancel the pending delay or period and drop any in-flight poll.
    pub fn stop(&self) {
        if self.phase.get() == LoopPhase::Stopped {
            return;
        }
        self.abort.abort();
        self.phase.set(LoopPhase::Stopped);
        log_info!(LogComponent::Application("LiveSync"), "⏹️ Streaming stopped");
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase.get()
    }

    pub fn is_running(&self) -> bool {
        self.phase.get() != LoopPhase::Stopped
    }

    pub fn sync_state(&self) -> SyncState {
        self.state.get()
    }

    pub fn series(&self) -> Rc<RefCell<CandleSeries>> {
        self.series.clone()
    }
}

#![allow(dead_code)]

use candle_sync_chart::application::TimerFacility;
use candle_sync_chart::domain::{
    chart::{ChartRenderer, ErrorNotifier, RedrawMode},
    errors::{ProviderError, ProviderResult},
    logging::TimeProvider,
    market_data::{Candle, CandleSeries, HistoryProvider, HistoryQuery, Ohlc, Price, Timestamp},
};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::LocalSpawner;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

pub const MINUTE: u64 = 60_000;
pub const HALF_HOUR: u64 = 1_800_000;
pub const DAY: u64 = 86_400_000;
/// 2024-03-15T12:34:56Z
pub const NOW: u64 = 1_710_506_096_000;
/// 2024-03-15T00:00:00Z
pub const MIDNIGHT: u64 = 1_710_460_800_000;

pub fn candle(ts: u64, close: f64) -> Candle {
    Candle::new(
        Timestamp::from_millis(ts),
        Ohlc::new(Price::from(close - 1.0), Price::from(close), Price::from(close), Price::from(close + 1.0)),
    )
}

pub fn series_of(timestamps: &[u64]) -> CandleSeries {
    let mut series = CandleSeries::new();
    for ts in timestamps {
        series.append(candle(*ts, 1.0)).unwrap();
    }
    series
}

pub fn is_strictly_increasing(series: &CandleSeries) -> bool {
    series.candles().windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

/// Answers queries from a fixed script, in order; an exhausted script returns no bars.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: RefCell<VecDeque<ProviderResult<Vec<Candle>>>>,
    pub queries: RefCell<Vec<HistoryQuery>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResult<Vec<Candle>>>) -> Self {
        Self { responses: RefCell::new(responses.into()), queries: RefCell::new(Vec::new()) }
    }

    pub fn push(&self, response: ProviderResult<Vec<Candle>>) {
        self.responses.borrow_mut().push_back(response);
    }

    pub fn query_count(&self) -> usize {
        self.queries.borrow().len()
    }
}

impl HistoryProvider for ScriptedProvider {
    async fn history(&self, query: &HistoryQuery) -> ProviderResult<Vec<Candle>> {
        self.queries.borrow_mut().push(query.clone());
        self.responses.borrow_mut().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Synthesizes bars aligned to the queried granularity for every bucket in
/// `[start, end)` that opened at or before `latest`.
pub struct SyntheticProvider {
    pub latest: Cell<u64>,
    pub queries: RefCell<Vec<HistoryQuery>>,
    /// Added to every close price, to observe revisions of the forming bar.
    pub price_shift: Cell<f64>,
    pub fail: Cell<bool>,
}

impl SyntheticProvider {
    pub fn new(latest: u64) -> Self {
        Self {
            latest: Cell::new(latest),
            queries: RefCell::new(Vec::new()),
            price_shift: Cell::new(0.0),
            fail: Cell::new(false),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.borrow().len()
    }
}

impl HistoryProvider for SyntheticProvider {
    async fn history(&self, query: &HistoryQuery) -> ProviderResult<Vec<Candle>> {
        self.queries.borrow_mut().push(query.clone());
        if self.fail.get() {
            return Err(ProviderError::NetworkError("offline".to_string()));
        }

        let step = query.granularity.fixed_seconds().expect("fixed granularity") * 1000;
        let start = query.range.start.value().div_ceil(step) * step;
        let end = query.range.end.value();
        let latest = self.latest.get();

        Ok((start..end)
            .step_by(step as usize)
            .filter(|ts| *ts <= latest)
            .map(|ts| candle(ts, 100.0 + (ts / step % 7) as f64 + self.price_shift.get()))
            .collect())
    }
}

/// Holds every request until the test releases it.
#[derive(Default)]
pub struct GatedProvider {
    gates: RefCell<VecDeque<oneshot::Receiver<ProviderResult<Vec<Candle>>>>>,
    pub queries: RefCell<Vec<HistoryQuery>>,
}

impl GatedProvider {
    /// Register the next request's gate.
    pub fn gate(&self) -> oneshot::Sender<ProviderResult<Vec<Candle>>> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().push_back(rx);
        tx
    }
}

impl HistoryProvider for GatedProvider {
    async fn history(&self, query: &HistoryQuery) -> ProviderResult<Vec<Candle>> {
        self.queries.borrow_mut().push(query.clone());
        let gate = self.gates.borrow_mut().pop_front();
        match gate {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(ProviderError::NetworkError("gate dropped".into()))),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    /// `(candle count, mode)` per draw
    pub draws: RefCell<Vec<(usize, RedrawMode)>>,
    pub clears: Cell<usize>,
    pub last: RefCell<Option<CandleSeries>>,
}

impl RecordingRenderer {
    pub fn modes(&self) -> Vec<RedrawMode> {
        self.draws.borrow().iter().map(|(_, mode)| *mode).collect()
    }
}

impl ChartRenderer for RecordingRenderer {
    fn draw(&self, series: &CandleSeries, mode: RedrawMode) {
        self.draws.borrow_mut().push((series.count(), mode));
        *self.last.borrow_mut() = Some(series.clone());
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    /// `(message, error type)`
    pub errors: RefCell<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<String> {
        self.errors.borrow().iter().map(|(_, kind)| kind.clone()).collect()
    }
}

impl ErrorNotifier for RecordingNotifier {
    fn notify_error(&self, message: &str, error_type: &str) {
        self.errors.borrow_mut().push((message.to_string(), error_type.to_string()));
    }
}

/// Sleeps complete only when the test fires them, in request order.
pub struct ManualTimer {
    spawner: LocalSpawner,
    pending: RefCell<VecDeque<(Duration, oneshot::Sender<()>)>>,
}

impl ManualTimer {
    pub fn new(spawner: LocalSpawner) -> Self {
        Self { spawner, pending: RefCell::new(VecDeque::new()) }
    }

    /// Wake the oldest sleeper that is still waiting; returns its delay.
    pub fn fire_next(&self) -> Option<Duration> {
        loop {
            let (delay, tx) = self.pending.borrow_mut().pop_front()?;
            if tx.send(()).is_ok() {
                return Some(delay);
            }
        }
    }

    /// Delays of sleepers that are still waiting.
    pub fn pending(&self) -> Vec<Duration> {
        self.pending
            .borrow()
            .iter()
            .filter(|(_, tx)| !tx.is_canceled())
            .map(|(delay, _)| *delay)
            .collect()
    }
}

impl TimerFacility for ManualTimer {
    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push_back((delay, tx));
        async move {
            let _ = rx.await;
        }
        .boxed_local()
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner.spawn_local(task).expect("local pool alive");
    }
}

pub struct FixedClock {
    pub now: Cell<u64>,
}

impl FixedClock {
    pub fn new(now: u64) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }
}

impl TimeProvider for FixedClock {
    fn current_timestamp(&self) -> u64 {
        self.now.get()
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        timestamp.to_string()
    }
}

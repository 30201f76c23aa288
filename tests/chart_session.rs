mod common;

use candle_sync_chart::application::{ChartSession, SessionPorts, SyncConfig};
use candle_sync_chart::domain::{
    chart::{ChartParameters, RedrawMode},
    errors::{ChartError, ProviderError},
    market_data::{Granularity, Timestamp},
};
use candle_sync_chart::time_utils::TimeParams;
use common::*;
use futures::executor::{LocalPool, block_on};
use std::rc::Rc;
use std::time::Duration;

const HOUR: u64 = 3_600_000;
/// 13:00 is the next half-hour and hour boundary after NOW, plus the epsilon.
const FIRST_POLL: Duration = Duration::from_millis(1_505_000);

struct Harness {
    session: ChartSession<SyntheticProvider>,
    provider: Rc<SyntheticProvider>,
    renderer: Rc<RecordingRenderer>,
    notifier: Rc<RecordingNotifier>,
    timer: Rc<ManualTimer>,
    pool: LocalPool,
}

fn harness() -> Harness {
    let pool = LocalPool::new();
    let provider = Rc::new(SyntheticProvider::new(NOW));
    let renderer = Rc::new(RecordingRenderer::default());
    let notifier = Rc::new(RecordingNotifier::default());
    let timer = Rc::new(ManualTimer::new(pool.spawner()));

    let session = ChartSession::new(
        SessionPorts {
            provider: provider.clone(),
            renderer: renderer.clone(),
            notifier: notifier.clone(),
            timer: timer.clone(),
            clock: Rc::new(FixedClock::new(NOW)),
        },
        SyncConfig::default(),
    );

    Harness { session, provider, renderer, notifier, timer, pool }
}

#[test]
fn defaults_cover_today_in_half_hours() {
    let h = harness();
    assert_eq!(h.session.params(), ChartParameters::defaults_at(NOW));

    let outcome = block_on(h.session.render()).unwrap();

    // 00:00 through 12:30
    assert_eq!(outcome.candles, 26);
    assert!(!outcome.streaming);
    assert!(outcome.provider_error.is_none());
    assert_eq!(*h.renderer.draws.borrow(), vec![(26, RedrawMode::Immediate)]);
    assert_eq!(h.provider.queries.borrow()[0].range.end.value(), NOW + 1000);
    assert!(!h.session.is_streaming());
}

#[test]
fn unknown_granularity_changes_nothing() {
    let h = harness();
    block_on(h.session.render()).unwrap();
    let params = h.session.params();
    let series = h.session.series();

    let result = block_on(h.session.set_granularity("BOGUS"));

    assert!(matches!(result, Err(ChartError::InvalidGranularity(code)) if code == "BOGUS"));
    assert_eq!(h.session.params(), params);
    assert_eq!(h.session.series(), series);
    assert_eq!(h.notifier.kinds(), vec!["InvalidGranularity".to_string()]);
    assert_eq!(h.provider.query_count(), 1);
}

#[test]
fn start_after_end_is_rejected_while_streaming() {
    let mut h = harness();
    h.pool.run_until(h.session.toggle_streaming(true)).unwrap();
    h.pool.run_until_stalled();
    let params = h.session.params();
    let sync_state = h.session.sync_state();
    let generation = h.session.generation();

    let thirteen = TimeParams { hours: Some(13), minutes: Some(0), seconds: Some(0), ..Default::default() };
    let result = h.pool.run_until(h.session.set_start_time(thirteen));

    assert!(matches!(result, Err(ChartError::InvalidParameter(_))));
    assert_eq!(h.session.params(), params);
    assert!(h.session.is_streaming());
    assert_eq!(h.session.sync_state(), sync_state);
    assert_eq!(h.session.generation(), generation);
    assert_eq!(h.notifier.kinds(), vec!["InvalidParameter".to_string()]);
}

#[test]
fn streaming_appends_new_bars_through_the_session() {
    let mut h = harness();

    let outcome = h.pool.run_until(h.session.toggle_streaming(true)).unwrap();
    h.pool.run_until_stalled();

    assert!(outcome.streaming);
    assert!(h.session.is_streaming());
    assert_eq!(h.session.params().range.end.value(), NOW);
    assert_eq!(h.timer.pending(), vec![FIRST_POLL]);
    let state = h.session.sync_state().unwrap();
    assert_eq!(state.last_known_timestamp.value(), MIDNIGHT + 25 * HALF_HOUR);

    h.provider.latest.set(MIDNIGHT + 26 * HALF_HOUR);
    h.timer.fire_next();
    h.pool.run_until_stalled();

    assert_eq!(h.session.candle_count(), 27);
    assert_eq!(h.renderer.draws.borrow().last(), Some(&(27, RedrawMode::Immediate)));
    assert_eq!(h.timer.pending(), vec![Duration::from_millis(450_000)]);
}

#[test]
fn parameter_change_restarts_the_loop() {
    let mut h = harness();
    h.pool.run_until(h.session.toggle_streaming(true)).unwrap();
    h.pool.run_until_stalled();
    let generation = h.session.generation();

    let outcome = h.pool.run_until(h.session.set_granularity("H1")).unwrap();
    h.pool.run_until_stalled();

    // 00:00 through 12:00
    assert_eq!(outcome.candles, 13);
    assert!(outcome.streaming);
    assert_eq!(h.session.params().granularity, Granularity::H1);
    assert!(h.session.generation() > generation);
    assert_eq!(h.timer.pending(), vec![FIRST_POLL]);
    assert_eq!(
        h.session.sync_state().unwrap().next_window_end,
        Timestamp::from_millis(MIDNIGHT + 13 * HOUR + 1000)
    );
}

#[test]
fn reset_stops_and_clears() {
    let mut h = harness();
    h.pool.run_until(h.session.toggle_streaming(true)).unwrap();
    h.pool.run_until_stalled();
    let params = h.session.params();

    h.session.reset();
    h.pool.run_until_stalled();

    assert!(!h.session.is_streaming());
    assert_eq!(h.session.candle_count(), 0);
    assert_eq!(h.renderer.clears.get(), 1);
    assert!(h.timer.pending().is_empty());
    assert_eq!(h.session.params(), params);
}

#[test]
fn nothing_to_stream_on_an_empty_day() {
    let mut h = harness();
    h.provider.latest.set(MIDNIGHT - 1);

    let outcome = h.pool.run_until(h.session.toggle_streaming(true)).unwrap();
    h.pool.run_until_stalled();

    assert_eq!(outcome.candles, 0);
    assert!(!outcome.streaming);
    assert!(!h.session.is_streaming());
    assert!(h.timer.pending().is_empty());
    assert_eq!(*h.renderer.draws.borrow(), vec![(0, RedrawMode::Immediate)]);
}

#[test]
fn provider_failure_is_reported_not_raised() {
    let h = harness();
    h.provider.fail.set(true);

    let outcome = block_on(h.session.render()).unwrap();

    assert_eq!(outcome.candles, 0);
    assert!(matches!(outcome.provider_error, Some(ProviderError::NetworkError(_))));
    assert_eq!(h.notifier.kinds(), vec!["ProviderError".to_string()]);
}

#[test]
fn end_time_takes_partial_fields() {
    let h = harness();
    let six = TimeParams { hours: Some(6), minutes: Some(0), seconds: Some(0), ..Default::default() };

    let outcome = block_on(h.session.set_end_time(six)).unwrap();

    assert_eq!(h.session.params().range.end.value(), MIDNIGHT + 6 * HOUR);
    // 00:00 through 06:00, the epsilon includes the bar at the end
    assert_eq!(outcome.candles, 13);
}

#[test]
fn instrument_is_normalized_or_rejected() {
    let h = harness();

    block_on(h.session.set_instrument("  gbp_usd ")).unwrap();
    assert_eq!(h.session.params().instrument.value(), "GBP_USD");
    assert_eq!(h.provider.queries.borrow()[0].instrument.value(), "GBP_USD");

    let result = block_on(h.session.set_instrument("   "));
    assert!(matches!(result, Err(ChartError::InvalidParameter(_))));
    assert_eq!(h.session.params().instrument.value(), "GBP_USD");
}

#[test]
fn corrupt_rebuild_keeps_previous_parameters_and_stream() {
    let pool = LocalPool::new();
    let provider = Rc::new(ScriptedProvider::new(vec![
        Ok(vec![candle(MIDNIGHT, 1.0)]),
        Ok(vec![candle(MIDNIGHT + HALF_HOUR, 1.0), candle(MIDNIGHT, 1.0)]),
    ]));
    let notifier = Rc::new(RecordingNotifier::default());
    let mut params = ChartParameters::defaults_at(NOW);
    params.streaming_enabled = true;
    let session = ChartSession::with_parameters(
        SessionPorts {
            provider: provider.clone(),
            renderer: Rc::new(RecordingRenderer::default()),
            notifier: notifier.clone(),
            timer: Rc::new(ManualTimer::new(pool.spawner())),
            clock: Rc::new(FixedClock::new(NOW)),
        },
        SyncConfig::default(),
        params.clone(),
    );
    block_on(session.render()).unwrap();
    assert!(session.is_streaming());

    let result = block_on(session.set_granularity("H1"));

    assert!(matches!(result, Err(ChartError::SeriesCorruption(_))));
    assert_eq!(session.params(), params);
    assert_eq!(session.candle_count(), 1);
    assert!(session.is_streaming());
    assert_eq!(session.sync_state().map(|s| s.last_known_timestamp.value()), Some(MIDNIGHT));
    assert_eq!(notifier.kinds(), vec!["SeriesCorruption".to_string()]);
    assert_eq!(provider.query_count(), 2);
}

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gloo::console;
use std::time::Duration;

use crate::application::TimerFacility;
use crate::domain::logging::{LogEntry, LogLevel, Logger, TimeProvider, get_time_provider};

/// Writes log entries to the browser console
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn new_development() -> Self {
        Self::new(LogLevel::Debug)
    }

    pub fn new_production() -> Self {
        Self::new(LogLevel::Warn)
    }
}

impl Logger for ConsoleLogger {
    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn log(&self, entry: LogEntry) {
        let line = format!("{} {}", get_time_provider().format_timestamp(entry.timestamp), entry);
        match entry.level {
            LogLevel::Debug => console::debug!(line),
            LogLevel::Info => console::log!(line),
            LogLevel::Warn => console::warn!(line),
            LogLevel::Error => console::error!(line),
        }
    }
}

/// Wall clock backed by `Date.now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserTimeProvider;

impl BrowserTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for BrowserTimeProvider {
    fn current_timestamp(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(timestamp as f64));
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            date.get_hours(),
            date.get_minutes(),
            date.get_seconds(),
            date.get_milliseconds()
        )
    }
}

/// Timers on the browser event loop
#[derive(Debug, Default, Clone, Copy)]
pub struct GlooTimer;

impl TimerFacility for GlooTimer {
    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()> {
        // setTimeout fires immediately past i32::MAX milliseconds.
        let millis = delay.as_millis().min(i32::MAX as u128) as u32;
        gloo_timers::future::TimeoutFuture::new(millis).boxed_local()
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

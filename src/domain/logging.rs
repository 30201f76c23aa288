use derive_more::Display;
use std::fmt;
use std::sync::OnceLock;

/// Severity of a log entry, ordered from chattiest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum LogLevel {
    #[display(fmt = "DEBUG")]
    Debug,
    #[display(fmt = "INFO")]
    Info,
    #[display(fmt = "WARN")]
    Warn,
    #[display(fmt = "ERROR")]
    Error,
}

/// Layer and unit that produced an entry
#[derive(Debug, Clone, Display)]
pub enum LogComponent {
    #[display(fmt = "DOM:{}", _0)]
    Domain(&'static str),
    #[display(fmt = "APP:{}", _0)]
    Application(&'static str),
    #[display(fmt = "INF:{}", _0)]
    Infrastructure(&'static str),
    #[display(fmt = "PRE:{}", _0)]
    Presentation(&'static str),
}

/// One log record. `fields` carry key/value context such as a query window.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: u64,
    pub level: LogLevel,
    pub component: LogComponent,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    /// Stamped with the global time provider.
    pub fn new(level: LogLevel, component: LogComponent, message: impl Into<String>) -> Self {
        Self {
            timestamp: get_time_provider().current_timestamp(),
            level,
            component,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.component, self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Wall clock in epoch milliseconds.
pub trait TimeProvider {
    fn current_timestamp(&self) -> u64;
    fn format_timestamp(&self, timestamp: u64) -> String;
}

/// Sink for log entries
pub trait Logger: Send + Sync {
    fn log(&self, entry: LogEntry);

    /// Entries below the sink's threshold are dropped before they reach `log`.
    fn enabled(&self, _level: LogLevel) -> bool {
        true
    }
}

static GLOBAL_LOGGER: OnceLock<Box<dyn Logger + Sync + Send>> = OnceLock::new();
static GLOBAL_TIME_PROVIDER: OnceLock<Box<dyn TimeProvider + Sync + Send>> = OnceLock::new();

/// Install the process-wide logger; later calls are ignored.
pub fn init_logger(logger: Box<dyn Logger + Sync + Send>) {
    let _ = GLOBAL_LOGGER.set(logger);
}

/// Install the clock used to stamp entries; later calls are ignored.
pub fn init_time_provider(time_provider: Box<dyn TimeProvider + Sync + Send>) {
    let _ = GLOBAL_TIME_PROVIDER.set(time_provider);
}

pub fn get_logger() -> &'static dyn Logger {
    GLOBAL_LOGGER
        .get()
        .map(|logger| logger.as_ref() as &dyn Logger)
        .unwrap_or(&NoOpLogger)
}

pub fn get_time_provider() -> &'static dyn TimeProvider {
    GLOBAL_TIME_PROVIDER
        .get()
        .map(|provider| provider.as_ref() as &dyn TimeProvider)
        .unwrap_or(&SequenceTimeProvider)
}

/// Hand an entry to the installed logger if it accepts the level.
pub fn emit(entry: LogEntry) {
    let logger = get_logger();
    if logger.enabled(entry.level) {
        logger.log(entry);
    }
}

struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _entry: LogEntry) {}

    fn enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// Fallback clock before `init_time_provider`: a sequence number keeps entries ordered.
struct SequenceTimeProvider;

impl TimeProvider for SequenceTimeProvider {
    fn current_timestamp(&self) -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        format!("#{:06}", timestamp)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_entry {
    ($level:ident, $component:expr, { $($key:ident = $value:expr),* $(,)? }, $($arg:tt)*) => {
        $crate::domain::logging::emit(
            $crate::domain::logging::LogEntry::new(
                $crate::domain::logging::LogLevel::$level,
                $component,
                format!($($arg)*),
            )
            $(.field(stringify!($key), &$value))*
        )
    };
    ($level:ident, $component:expr, $($arg:tt)*) => {
        $crate::__log_entry!($level, $component, {}, $($arg)*)
    };
}

/// `log_debug!(component, { key = value, .. }, "fmt", args..)`; the field block is optional.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::__log_entry!(Debug, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::__log_entry!(Info, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__log_entry!(Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__log_entry!(Error, $($arg)*)
    };
}

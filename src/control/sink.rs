//! Log sink
//!
//! Operator-facing output. The console and the frame loop both write here
//! concurrently; each call emits one complete record.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Operator log levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("loglevel {0} unknown.")]
pub struct UnknownLevel(pub String);

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// `EnvFilter` directive for this level
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    /// Accepts a level name or its index (`0` = error .. `3` = debug)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return LogLevel::ALL
                .get(index)
                .copied()
                .ok_or_else(|| UnknownLevel(s.to_string()));
        }

        LogLevel::ALL
            .iter()
            .find(|level| level.name() == s || level.directive() == s)
            .copied()
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// Destination for operator messages
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    /// Change which levels are shown
    fn set_level(&self, level: LogLevel);

    /// Clear the message area, where the sink has one
    fn clear(&self) {}
}

/// Handle used to swap the process-wide filter at runtime
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Sink that writes through `tracing`
pub struct TracingSink {
    filter: FilterHandle,
}

impl TracingSink {
    pub fn new(filter: FilterHandle) -> Self {
        Self { filter }
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
        }
    }

    fn set_level(&self, level: LogLevel) {
        match self.filter.reload(EnvFilter::new(level.directive())) {
            Ok(()) => tracing::info!("loglevel {} set", level),
            Err(e) => tracing::error!("Could not change loglevel: {}", e),
        }
    }

    fn clear(&self) {
        print!("\x1B[2J\x1B[1;1H");
    }
}

/// Sink that records messages, for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    pub records: parking_lot::Mutex<Vec<(LogLevel, String)>>,
    pub level: parking_lot::Mutex<Option<LogLevel>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().push((level, message.to_string()));
    }

    fn set_level(&self, level: LogLevel) {
        *self.level.lock() = Some(level);
    }

    fn clear(&self) {
        self.records.lock().clear();
    }
}

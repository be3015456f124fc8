//! Narrow logging capability used at the orchestration boundary.
//!
//! Rules, the registry, the classifier and the resolver never log. The
//! `Validators` layer reports progress through a [`ValidationLogger`], so an
//! embedding application can route messages wherever it likes.

use parking_lot::Mutex;
use std::fmt;

/// Log target used by [`LogFacade`].
pub const LOG_TARGET: &str = "mapguard";

/// Logging capability with four levels.
pub trait ValidationLogger: Send + Sync {
    /// Informational progress message.
    fn info(&self, message: &str);
    /// Something suspicious but non-fatal.
    fn warning(&self, message: &str);
    /// A failure worth surfacing.
    fn error(&self, message: &str);
    /// Verbose diagnostics.
    fn debug(&self, message: &str);
}

/// Forwards to the `log` crate facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl ValidationLogger for LogFacade {
    fn info(&self, message: &str) {
        log::info!(target: LOG_TARGET, "{}", message);
    }

    fn warning(&self, message: &str) {
        log::warn!(target: LOG_TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        log::error!(target: LOG_TARGET, "{}", message);
    }

    fn debug(&self, message: &str) {
        log::debug!(target: LOG_TARGET, "{}", message);
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentLogger;

impl ValidationLogger for SilentLogger {
    fn info(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

/// Level attached to a recorded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Keeps messages in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.lock().clone()
    }

    /// Messages recorded at one level.
    pub fn at_level(&self, level: LogLevel) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }

    fn record(&self, level: LogLevel, message: &str) {
        self.messages.lock().push((level, message.to_string()));
    }
}

impl ValidationLogger for MemoryLogger {
    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.record(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }

    fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, message);
    }
}

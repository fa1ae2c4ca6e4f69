//! Logger collaborator for document diagnostics.
//!
//! Parser, checker and postprocessor report recoverable problems here. The
//! checker calls it from several threads at once, so implementations must
//! serialize their own writes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Severity of a collected message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Receives diagnostics produced while converting a document.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    /// Number of `error` calls so far.
    fn error_count(&self) -> usize;
}

// ─────────────────────────────────────────────────────────────────────────────
// Console Logger
// ─────────────────────────────────────────────────────────────────────────────

/// Forwards every message to the `log` facade.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    errors: AtomicUsize,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for ConsoleLogger {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        log::error!("{}", message);
    }

    fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Logger
// ─────────────────────────────────────────────────────────────────────────────

/// A single collected message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub text: String,
}

/// Keeps messages in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    messages: Mutex<Vec<LogMessage>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: &str) {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        messages.push(LogMessage {
            level,
            text: message.to_string(),
        });
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Texts of all messages with the given level.
    pub fn texts(&self, level: LogLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.level == level)
            .map(|m| m.text)
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.texts(LogLevel::Warn)
    }

    pub fn errors(&self) -> Vec<String> {
        self.texts(LogLevel::Error)
    }
}

impl Logger for MemoryLogger {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }

    fn error_count(&self) -> usize {
        self.texts(LogLevel::Error).len()
    }
}

//! Event channel between the translation worker and its caller, plus the
//! cooperative cancellation token.
//!
//! The worker never talks to a UI directly; it emits typed `BatchEvent`s
//! over an unbounded mpsc channel and mirrors log entries to `tracing`.
//! A dropped receiver is fine: emission becomes a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Severity attached to worker log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Which provider served a completed language job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceReported {
    Primary,
    Secondary,
    None,
}

impl ServiceReported {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceReported::Primary => "DeepL",
            ServiceReported::Secondary => "Google Translate",
            ServiceReported::None => "None",
        }
    }
}

/// Everything the worker reports back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Progress {
        current: usize,
        total: usize,
    },
    Status(String),
    Log {
        message: String,
        level: LogLevel,
    },
    LanguageCompleted {
        code: String,
        success: bool,
        service: ServiceReported,
    },
    BatchCompleted,
}

/// Sending half of the worker event channel.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl EventSink {
    /// Create a sink together with the receiver the caller drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: BatchEvent) {
        // The caller may have gone away; the worker keeps running regardless.
        let _ = self.tx.send(event);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => info!("{message}"),
            LogLevel::Warning => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
        self.emit(BatchEvent::Log { message, level });
    }

    pub fn status(&self, status: impl Into<String>) {
        self.emit(BatchEvent::Status(status.into()));
    }

    pub fn progress(&self, current: usize, total: usize) {
        self.emit(BatchEvent::Progress { current, total });
    }

    pub fn language_completed(&self, code: &str, success: bool, service: ServiceReported) {
        self.emit(BatchEvent::LanguageCompleted {
            code: code.to_string(),
            success,
            service,
        });
    }

    pub fn batch_completed(&self) {
        self.emit(BatchEvent::BatchCompleted);
    }
}

/// Shared cancellation flag, checked between languages, between tree
/// recursion steps and between provider retry attempts. Cooperative only:
/// an in-flight network call runs to completion before the flag is seen.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

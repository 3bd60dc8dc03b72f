//! Progress reporting
//!
//! The pipeline never waits on whoever is listening: every call here is
//! fire-and-forget and a closed receiver is ignored.

use chrono::{DateTime, Local};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::logger;
use crate::models::InstallEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: InstallEvent);

    /// Plain status line.
    fn report(&self, timestamp: DateTime<Local>, message: &str, is_error: bool) {
        self.emit(InstallEvent::Progress {
            timestamp,
            message: message.to_string(),
            is_error,
        });
    }
}

/// Forwards events over an unbounded channel to a front end.
pub struct ChannelSink {
    tx: UnboundedSender<InstallEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<InstallEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, UnboundedReceiver<InstallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: InstallEvent) {
        // Receiver gone means nobody is watching any more; keep installing.
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory. Used by tests and by callers that only need
/// the final transcript.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<InstallEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InstallEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn error_count(&self) -> usize {
        self.events().iter().filter(|e| e.is_error()).count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(InstallEvent::message).collect()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, event: InstallEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Request-scoped reporter: mirrors each message into the application log
/// and forwards it to the sink with a timestamp.
pub(crate) struct Reporter<'a> {
    sink: &'a dyn ProgressSink,
    context: &'static str,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, context: &'static str) -> Self {
        Self { sink, context }
    }

    pub(crate) fn info(&self, message: &str) {
        logger::log_info(message, Some(self.context));
        self.sink.report(Local::now(), message, false);
    }

    pub(crate) fn error(&self, message: &str) {
        logger::log_error(message, Some(self.context));
        self.sink.report(Local::now(), message, true);
    }

    pub(crate) fn emit(&self, event: InstallEvent) {
        self.sink.emit(event);
    }
}

//! Where the recorder reports deploy events it could not persist.
//!
//! A bus listener has no caller to return an error to, and it must not
//! take the process down. Failures are handed to an [`ErrorSink`] instead.

use std::sync::Mutex;

use launchpad_state::StateError;
use tokio::sync::mpsc;
use tracing::error;

/// A deploy event that was received but not stored.
#[derive(Debug)]
pub struct RecordFailure {
    pub topic: String,
    pub app: String,
    pub message: String,
    pub error: StateError,
}

/// Receives recorder failures.
pub trait ErrorSink: Send + Sync {
    fn report(&self, failure: RecordFailure);
}

/// Logs every failure at `error` level and carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, failure: RecordFailure) {
        error!(
            topic = %failure.topic,
            app = %failure.app,
            message = %failure.message,
            error = %failure.error,
            "failed to record deploy event"
        );
    }
}

/// Forwards failures to a supervising task.
///
/// If the receiving side is gone the failure is logged instead.
#[derive(Debug, Clone)]
pub struct ChannelErrorSink {
    tx: mpsc::UnboundedSender<RecordFailure>,
}

impl ChannelErrorSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RecordFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorSink for ChannelErrorSink {
    fn report(&self, failure: RecordFailure) {
        if let Err(mpsc::error::SendError(failure)) = self.tx.send(failure) {
            TracingErrorSink.report(failure);
        }
    }
}

/// Keeps failures in memory until drained.
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    failures: Mutex<Vec<RecordFailure>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every failure collected so far.
    pub fn drain(&self) -> Vec<RecordFailure> {
        std::mem::take(
            &mut *self
                .failures
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, failure: RecordFailure) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> RecordFailure {
        RecordFailure {
            topic: "jobs.clone".into(),
            app: "app1".into(),
            message: "cloning".into(),
            error: StateError::Write("disk full".into()),
        }
    }

    #[test]
    fn collecting_sink_drains_in_order() {
        let sink = CollectingErrorSink::new();
        sink.report(failure());
        let mut second = failure();
        second.app = "app2".into();
        sink.report(second);

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].app, "app2");
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn channel_sink_forwards_to_receiver() {
        let (sink, mut rx) = ChannelErrorSink::new();
        sink.report(failure());
        let received = rx.try_recv().unwrap();
        assert!(received.error.is_unavailable());
    }

    #[test]
    fn channel_sink_survives_a_closed_receiver() {
        let (sink, rx) = ChannelErrorSink::new();
        drop(rx);
        sink.report(failure());
    }
}

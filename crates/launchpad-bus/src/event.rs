//! Payloads carried by the event bus.
//!
//! Any payload can travel on the bus. A payload becomes part of the deploy
//! log only by opting in through [`BusEvent::as_log_worthy`].

use serde::{Deserialize, Serialize};

/// A payload that can be published on the [`EventBus`](crate::EventBus).
pub trait BusEvent: Send {
    /// The log-worthy view of this payload, if it has one.
    fn as_log_worthy(&mut self) -> Option<&mut dyn LogWorthyEvent> {
        None
    }
}

/// The capability the deploy-log recorder needs from a payload.
pub trait LogWorthyEvent {
    /// Id of the app the event belongs to.
    fn app(&self) -> &str;

    /// Human-readable log line.
    fn message(&self) -> &str;

    /// Called with the topic the event was received on.
    fn set_event_name(&mut self, name: &str);
}

/// Progress report from a deploy pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub app: String,
    pub message: String,
    /// Stamped by the receiver; empty until delivered.
    #[serde(default)]
    pub event_name: String,
}

impl JobEvent {
    pub fn new(app: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            message: message.into(),
            event_name: String::new(),
        }
    }
}

impl LogWorthyEvent for JobEvent {
    fn app(&self) -> &str {
        &self.app
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn set_event_name(&mut self, name: &str) {
        self.event_name = name.to_string();
    }
}

impl BusEvent for JobEvent {
    fn as_log_worthy(&mut self) -> Option<&mut dyn LogWorthyEvent> {
        Some(self)
    }
}

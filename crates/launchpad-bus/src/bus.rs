//! In-process publish/subscribe bus with named topics.
//!
//! Delivery is synchronous: `publish` calls every listener of the topic on
//! the publishing thread, in subscription order, before returning. A slow
//! listener therefore stalls the publisher.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::event::BusEvent;

/// Receives payloads published on the topics it subscribed to.
pub trait Listener: Send + Sync {
    fn on_event(&self, topic: &str, payload: &mut dyn BusEvent);
}

/// Topic registry shared by every clone of the bus.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<HashMap<String, Vec<Arc<dyn Listener>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `topic`.
    pub fn subscribe(&self, topic: &str, listener: Arc<dyn Listener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.entry(topic.to_string()).or_default().push(listener);
        trace!(%topic, "listener subscribed");
    }

    /// Deliver `payload` to every listener of `topic`. Returns how many
    /// listeners were invoked.
    pub fn publish(&self, topic: &str, payload: &mut dyn BusEvent) -> usize {
        // Snapshot under the lock so listeners may subscribe while handling.
        let targets: Vec<Arc<dyn Listener>> = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners.get(topic).cloned().unwrap_or_default()
        };
        for listener in &targets {
            listener.on_event(topic, payload);
        }
        trace!(%topic, delivered = targets.len(), "event published");
        targets.len()
    }

    /// Number of listeners registered for `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(topic)
            .map_or(0, Vec::len)
    }
}

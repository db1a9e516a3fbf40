//! Deploy-log recorder — turns lifecycle notifications into deploy events.
//!
//! The recorder subscribes itself to every [`LIFECYCLE`] topic of the bus
//! it is attached to. For each log-worthy payload it stamps the payload's
//! event name with the topic and appends `(app, message)` to the deploy
//! log. Payloads that are not log-worthy are ignored.

use std::sync::Arc;

use launchpad_state::{DeployEvent, DeployEventRepository};
use tracing::debug;

use crate::bus::{EventBus, Listener};
use crate::event::BusEvent;
use crate::sink::{ErrorSink, RecordFailure};
use crate::topics::LIFECYCLE;

pub struct DeployLogRecorder {
    events: Arc<dyn DeployEventRepository>,
    sink: Arc<dyn ErrorSink>,
}

impl DeployLogRecorder {
    pub fn new(events: Arc<dyn DeployEventRepository>, sink: Arc<dyn ErrorSink>) -> Self {
        Self { events, sink }
    }

    /// Build a recorder and subscribe it to every lifecycle topic on `bus`.
    pub fn attach(
        bus: &EventBus,
        events: Arc<dyn DeployEventRepository>,
        sink: Arc<dyn ErrorSink>,
    ) -> Arc<Self> {
        let recorder = Arc::new(Self::new(events, sink));
        for topic in LIFECYCLE {
            bus.subscribe(topic, recorder.clone());
        }
        debug!(topics = LIFECYCLE.len(), "deploy log recorder attached");
        recorder
    }

    /// Record `payload` as received on `topic`.
    ///
    /// Returns the stored event, or `None` if the payload is not log-worthy
    /// or storing it failed (the failure goes to the error sink).
    pub fn record(&self, topic: &str, payload: &mut dyn BusEvent) -> Option<DeployEvent> {
        let event = payload.as_log_worthy()?;
        event.set_event_name(topic);

        match self.events.add_deploy_event(event.app(), event.message()) {
            Ok(stored) => {
                debug!(%topic, app = %stored.app, id = %stored.id, "deploy event recorded");
                Some(stored)
            }
            Err(error) => {
                self.sink.report(RecordFailure {
                    topic: topic.to_string(),
                    app: event.app().to_string(),
                    message: event.message().to_string(),
                    error,
                });
                None
            }
        }
    }
}

impl Listener for DeployLogRecorder {
    fn on_event(&self, topic: &str, payload: &mut dyn BusEvent) {
        self.record(topic, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::JobEvent;
    use crate::sink::CollectingErrorSink;
    use crate::topics;
    use launchpad_state::{StateError, StateResult, StateStore};

    struct Heartbeat;
    impl BusEvent for Heartbeat {}

    /// Repository whose store is always down.
    struct Unavailable;

    impl DeployEventRepository for Unavailable {
        fn add_deploy_event(&self, _app: &str, _message: &str) -> StateResult<DeployEvent> {
            Err(StateError::Transaction("store unavailable".into()))
        }
        fn get_app_deploy_logs(&self, _app: &str) -> StateResult<Vec<DeployEvent>> {
            Ok(Vec::new())
        }
        fn get_next_unread_message(&self, app: &str) -> StateResult<DeployEvent> {
            Err(StateError::NotFound(app.to_string()))
        }
        fn update_deploy_event(&self, event: &DeployEvent) -> StateResult<()> {
            Err(StateError::NotFound(event.id.clone()))
        }
    }

    fn attached() -> (EventBus, StateStore, Arc<CollectingErrorSink>) {
        let bus = EventBus::new();
        let store = StateStore::open_in_memory().unwrap();
        let sink = Arc::new(CollectingErrorSink::new());
        DeployLogRecorder::attach(&bus, Arc::new(store.clone()), sink.clone());
        (bus, store, sink)
    }

    #[test]
    fn attach_subscribes_every_lifecycle_topic() {
        let (bus, _store, _sink) = attached();
        for topic in LIFECYCLE {
            assert_eq!(bus.listener_count(topic), 1, "{topic}");
        }
        assert_eq!(bus.listener_count("jobs.unrelated"), 0);
    }

    #[test]
    fn log_worthy_payload_is_stored_and_stamped() {
        let (bus, store, sink) = attached();
        let mut job = JobEvent::new("app1", "cloning");

        bus.publish(topics::JOBS_CLONE, &mut job);

        assert_eq!(job.event_name, topics::JOBS_CLONE);
        let logs = store.get_app_deploy_logs("app1").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "cloning");
        assert!(logs[0].unread);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn every_lifecycle_topic_records() {
        let (bus, store, _sink) = attached();
        for topic in LIFECYCLE {
            bus.publish(topic, &mut JobEvent::new("app1", topic));
        }
        let messages: Vec<String> = store
            .get_app_deploy_logs("app1")
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, LIFECYCLE);
    }

    #[test]
    fn other_payloads_are_ignored() {
        let (bus, store, sink) = attached();
        assert_eq!(bus.publish(topics::APP_CREATED, &mut Heartbeat), 1);
        assert!(store.get_app_deploy_logs("app1").unwrap().is_empty());
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn unsubscribed_topics_are_not_recorded() {
        let (bus, store, _sink) = attached();
        let mut job = JobEvent::new("app1", "noise");
        bus.publish("jobs.unrelated", &mut job);
        assert!(job.event_name.is_empty());
        assert!(store.get_app_deploy_logs("app1").unwrap().is_empty());
    }

    #[test]
    fn persistence_failure_goes_to_the_sink() {
        let bus = EventBus::new();
        let sink = Arc::new(CollectingErrorSink::new());
        DeployLogRecorder::attach(&bus, Arc::new(Unavailable), sink.clone());

        bus.publish(topics::JOBS_DEPLOY, &mut JobEvent::new("app1", "deploying"));
        // Delivery keeps working after a failure.
        bus.publish(topics::JOBS_DEPLOY, &mut JobEvent::new("app1", "still here"));

        let failures = sink.drain();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].topic, topics::JOBS_DEPLOY);
        assert_eq!(failures[0].app, "app1");
        assert_eq!(failures[0].message, "deploying");
        assert!(failures[0].error.is_unavailable());
    }

    #[test]
    fn record_returns_the_stored_event() {
        let store = StateStore::open_in_memory().unwrap();
        let recorder = DeployLogRecorder::new(
            Arc::new(store.clone()),
            Arc::new(CollectingErrorSink::new()),
        );

        let stored = recorder
            .record(topics::APP_DEPLOYED, &mut JobEvent::new("app1", "live"))
            .unwrap();
        assert_eq!(store.get_next_unread_message("app1").unwrap(), stored);
        assert!(recorder.record(topics::APP_DEPLOYED, &mut Heartbeat).is_none());
    }
}

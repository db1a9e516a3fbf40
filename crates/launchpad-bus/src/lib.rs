//! launchpad-bus — lifecycle event bus and the deploy-log recorder.
//!
//! Deploy pipeline stages publish payloads on named topics of an
//! [`EventBus`]. The [`DeployLogRecorder`] listens on the lifecycle topics
//! and appends every log-worthy payload to the deploy log in
//! `launchpad-state`.
//!
//! # Architecture
//!
//! ```text
//! producer ── publish(topic, &mut payload) ──▶ EventBus
//!                                                │ (synchronous)
//!                                                ▼
//!                                        DeployLogRecorder
//!                                          ├── payload.as_log_worthy()?
//!                                          ├── set_event_name(topic)
//!                                          ├── add_deploy_event(app, message)
//!                                          └── on failure → ErrorSink
//! ```
//!
//! The bus is an explicit value: every test and every process builds its
//! own and hands it to the recorder.

pub mod bus;
pub mod event;
pub mod recorder;
pub mod sink;
pub mod topics;

pub use bus::{EventBus, Listener};
pub use event::{BusEvent, JobEvent, LogWorthyEvent};
pub use recorder::DeployLogRecorder;
pub use sink::{ChannelErrorSink, CollectingErrorSink, ErrorSink, RecordFailure, TracingErrorSink};

//! Domain types for the Launchpad state store.
//!
//! Both entities are serialized to JSON for storage in redb tables. They
//! reference each other by value only: a [`DeployEvent`] names its app by
//! id and may outlive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tables::event_index_key;

/// Unique, caller-supplied identifier of an app.
pub type AppId = String;

/// Unique identifier of a deploy event (random UUID).
pub type EventId = String;

// ── App ───────────────────────────────────────────────────────────

/// A deployed unit with a bounded lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub id: AppId,
    /// Source location the app was built from.
    pub repository: String,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Eviction deadline. May be moved by policy via `update_app`.
    pub expires_at: DateTime<Utc>,
    /// One-way flag set by `kill_app`.
    pub killed: bool,
}

impl App {
    /// An app is due for teardown once its deadline has strictly passed,
    /// unless it has already been killed.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.killed && self.expires_at < now
    }
}

// ── Deploy event ──────────────────────────────────────────────────

/// One audit-log line tied to an app, doubling as an unread-queue entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployEvent {
    pub id: EventId,
    pub app: AppId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// True until the consumer marks the event read.
    pub unread: bool,
}

impl DeployEvent {
    /// Build the composite key used by the per-app index tables.
    pub(crate) fn index_key(&self) -> String {
        event_index_key(&self.app, self.timestamp.timestamp_micros(), &self.id)
    }
}

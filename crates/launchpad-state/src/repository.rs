//! Repository traits over the two entity collections.
//!
//! [`StateStore`](crate::StateStore) implements both. Consumers such as the
//! bus recorder and the expiry sweeper depend on the trait so they can be
//! exercised against a failing or recording double.

use chrono::{DateTime, Utc};

use crate::error::StateResult;
use crate::types::{App, DeployEvent};

/// Lifecycle operations over apps.
pub trait AppRepository: Send + Sync {
    /// Create an app expiring at `ttl`. Fails with `DuplicateKey` if `id`
    /// is taken.
    fn add_app(&self, id: &str, ttl: DateTime<Utc>, repository: &str) -> StateResult<App>;

    /// Replace the stored app with `app`, keyed by `app.id`.
    fn update_app(&self, app: &App) -> StateResult<()>;

    fn get_app(&self, id: &str) -> StateResult<App>;

    /// Every app, in id order.
    fn list_apps(&self) -> StateResult<Vec<App>>;

    /// Apps whose deadline has passed and that are not yet killed.
    /// Results are unordered.
    fn get_expired_apps(&self) -> StateResult<Vec<App>>;

    /// Mark `app` killed and persist it. Last write wins against a
    /// concurrent kill; the outcome is the same.
    fn kill_app(&self, app: &mut App) -> StateResult<()> {
        app.killed = true;
        self.update_app(app)
    }
}

/// Append and unread-queue operations over deploy events.
pub trait DeployEventRepository: Send + Sync {
    /// Append a new unread event for `app`.
    fn add_deploy_event(&self, app: &str, message: &str) -> StateResult<DeployEvent>;

    /// All events of `app`, oldest first.
    fn get_app_deploy_logs(&self, app: &str) -> StateResult<Vec<DeployEvent>>;

    /// Oldest unread event of `app`, or `NotFound` when the queue is empty.
    fn get_next_unread_message(&self, app: &str) -> StateResult<DeployEvent>;

    /// Replace the stored event with `event`, keyed by `event.id`.
    fn update_deploy_event(&self, event: &DeployEvent) -> StateResult<()>;

    /// Mark `event` read and persist it.
    fn mark_read(&self, event: &mut DeployEvent) -> StateResult<()> {
        event.unread = false;
        self.update_deploy_event(event)
    }
}

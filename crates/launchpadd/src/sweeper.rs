//! Expiry sweeper — kills apps whose lifetime window has passed.
//!
//! Each expired app is killed independently: a failure on one app is
//! logged and counted and the sweep moves on to the next.

use std::sync::Arc;
use std::time::Duration;

use launchpad_state::{AppRepository, StateResult};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Outcome of one sweep pass.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    /// Ids of the apps killed by this pass.
    pub killed: Vec<String>,
    /// Apps that vanished between the lookup and the kill.
    pub vanished: Vec<String>,
    /// Apps whose kill failed for any other reason.
    pub failed: Vec<String>,
}

/// Look up every expired app and kill it.
pub fn sweep_expired(apps: &dyn AppRepository) -> StateResult<SweepReport> {
    let mut report = SweepReport::default();
    for mut app in apps.get_expired_apps()? {
        match apps.kill_app(&mut app) {
            Ok(()) => report.killed.push(app.id),
            Err(e) if e.is_not_found() => {
                warn!(app = %app.id, "expired app disappeared before it was killed");
                report.vanished.push(app.id);
            }
            Err(e) => {
                error!(app = %app.id, error = %e, "failed to kill expired app");
                report.failed.push(app.id);
            }
        }
    }
    Ok(report)
}

pub struct Sweeper {
    apps: Arc<dyn AppRepository>,
}

impl Sweeper {
    pub fn new(apps: Arc<dyn AppRepository>) -> Self {
        Self { apps }
    }

    pub fn sweep(&self) -> StateResult<SweepReport> {
        sweep_expired(self.apps.as_ref())
    }

    /// Run the sweep loop until `shutdown` fires.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "expiry sweeper started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.sweep() {
                        Ok(report) if !report.killed.is_empty() || !report.failed.is_empty() => {
                            info!(
                                killed = report.killed.len(),
                                failed = report.failed.len(),
                                "sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "sweep failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("expiry sweeper shutting down");
                    break;
                }
            }
        }
    }
}

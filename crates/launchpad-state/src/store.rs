//! StateStore — redb-backed persistence for Launchpad.
//!
//! Owns the database handle and makes sure every table exists before the
//! handle is handed out. The repository traits are implemented in the
//! `apps` and `events` modules. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::Database;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::clock::{Clock, MonotonicStamp, SystemClock};
use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::StateError::$variant(e.to_string())
    };
}
pub(crate) use map_err;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    pub(crate) db: Arc<Database>,
    pub(crate) stamp: MonotonicStamp,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::from_database(db)?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::from_database(db)?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Replace the wall clock used for creation times, expiry checks and
    /// event stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.stamp = MonotonicStamp::new(clock);
        self
    }

    fn from_database(db: Database) -> StateResult<Self> {
        let store = Self {
            db: Arc::new(db),
            stamp: MonotonicStamp::new(Arc::new(SystemClock)),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Create all entity and index tables if they don't exist yet.
    ///
    /// Entity tables are keyed by id, which is what makes app and event ids
    /// unique; without them no other operation is sound.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(IndexSetup))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(APPS).map_err(map_err!(IndexSetup))?;
        txn.open_table(DEPLOY_EVENTS).map_err(map_err!(IndexSetup))?;
        txn.open_table(EVENTS_BY_APP).map_err(map_err!(IndexSetup))?;
        txn.open_table(UNREAD_EVENTS).map_err(map_err!(IndexSetup))?;
        txn.commit().map_err(map_err!(IndexSetup))?;
        Ok(())
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> StateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(map_err!(Serialize))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StateResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StateError::Deserialize(e.to_string()))
}

//! Deploy-event repository backed by the `deploy_events` table and its two
//! per-app index tables.
//!
//! Every write touches the entity row and the index rows inside one write
//! transaction, so the indexes never disagree with the rows they point at.

use redb::{ReadOnlyTable, ReadableDatabase, ReadableTable};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StateError, StateResult};
use crate::repository::DeployEventRepository;
use crate::store::{StateStore, decode, encode, map_err};
use crate::tables::{DEPLOY_EVENTS, EVENTS_BY_APP, UNREAD_EVENTS, app_range_end, app_range_start};
use crate::types::DeployEvent;

impl DeployEventRepository for StateStore {
    fn add_deploy_event(&self, app: &str, message: &str) -> StateResult<DeployEvent> {
        let event = DeployEvent {
            id: Uuid::new_v4().to_string(),
            app: app.to_string(),
            message: message.to_string(),
            timestamp: self.stamp.next(),
            unread: true,
        };
        let value = encode(&event)?;
        let index_key = event.index_key();

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut events = txn.open_table(DEPLOY_EVENTS).map_err(map_err!(Table))?;
            if events.get(event.id.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::DuplicateKey(event.id));
            }
            events
                .insert(event.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            let mut by_app = txn.open_table(EVENTS_BY_APP).map_err(map_err!(Table))?;
            by_app
                .insert(index_key.as_str(), event.id.as_str())
                .map_err(map_err!(Write))?;

            let mut unread = txn.open_table(UNREAD_EVENTS).map_err(map_err!(Table))?;
            unread
                .insert(index_key.as_str(), event.id.as_str())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%app, id = %event.id, "deploy event added");
        Ok(event)
    }

    fn get_app_deploy_logs(&self, app: &str) -> StateResult<Vec<DeployEvent>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let index = txn.open_table(EVENTS_BY_APP).map_err(map_err!(Table))?;
        let events = txn.open_table(DEPLOY_EVENTS).map_err(map_err!(Table))?;

        let start = app_range_start(app);
        let end = app_range_end(app);
        let mut results = Vec::new();
        for entry in index
            .range(start.as_str()..end.as_str())
            .map_err(map_err!(Read))?
        {
            let (_, id) = entry.map_err(map_err!(Read))?;
            if let Some(event) = load_event(&events, id.value(), app)? {
                results.push(event);
            }
        }
        Ok(results)
    }

    fn get_next_unread_message(&self, app: &str) -> StateResult<DeployEvent> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let index = txn.open_table(UNREAD_EVENTS).map_err(map_err!(Table))?;
        let events = txn.open_table(DEPLOY_EVENTS).map_err(map_err!(Table))?;

        let start = app_range_start(app);
        let end = app_range_end(app);
        for entry in index
            .range(start.as_str()..end.as_str())
            .map_err(map_err!(Read))?
        {
            let (_, id) = entry.map_err(map_err!(Read))?;
            if let Some(event) = load_event(&events, id.value(), app)? {
                return Ok(event);
            }
        }
        Err(StateError::NotFound(format!("unread deploy event for {app}")))
    }

    fn update_deploy_event(&self, event: &DeployEvent) -> StateResult<()> {
        let new_key = event.index_key();

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored = {
            let mut events = txn.open_table(DEPLOY_EVENTS).map_err(map_err!(Table))?;
            let previous: DeployEvent = match events.get(event.id.as_str()).map_err(map_err!(Read))? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StateError::NotFound(event.id.clone())),
            };

            // Once read, an event stays read.
            let mut stored = event.clone();
            stored.unread = previous.unread && event.unread;
            let value = encode(&stored)?;
            events
                .insert(stored.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            let old_key = previous.index_key();
            let mut by_app = txn.open_table(EVENTS_BY_APP).map_err(map_err!(Table))?;
            if old_key != new_key {
                by_app.remove(old_key.as_str()).map_err(map_err!(Write))?;
                by_app
                    .insert(new_key.as_str(), stored.id.as_str())
                    .map_err(map_err!(Write))?;
            }

            let mut unread = txn.open_table(UNREAD_EVENTS).map_err(map_err!(Table))?;
            unread.remove(old_key.as_str()).map_err(map_err!(Write))?;
            if stored.unread {
                unread
                    .insert(new_key.as_str(), stored.id.as_str())
                    .map_err(map_err!(Write))?;
            }
            stored
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(app = %stored.app, id = %stored.id, unread = stored.unread, "deploy event stored");
        Ok(())
    }
}

/// Resolve an index entry to its event row. A dangling index entry is
/// skipped rather than failing the whole read.
///
/// The per-app key range also covers apps whose id starts with `"{app}\0"`,
/// so rows belonging to another app are skipped too.
fn load_event(
    events: &ReadOnlyTable<&'static str, &'static [u8]>,
    id: &str,
    app: &str,
) -> StateResult<Option<DeployEvent>> {
    match events.get(id).map_err(map_err!(Read))? {
        Some(guard) => {
            let event: DeployEvent = decode(guard.value())?;
            Ok((event.app == app).then_some(event))
        }
        None => {
            warn!(%id, "deploy event index points at a missing row");
            Ok(None)
        }
    }
}

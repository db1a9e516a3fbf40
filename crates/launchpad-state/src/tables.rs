//! redb table definitions for the Launchpad state store.
//!
//! Entity tables use `&str` keys (the entity id, which makes the id unique)
//! and `&[u8]` values (JSON-serialized domain types). Index tables map a
//! composite `{app}\0{timestamp_micros}\0{event_id}` key to the event id so
//! that a range scan over one app yields its events oldest first.

use redb::TableDefinition;

/// Apps keyed by `{app_id}`.
pub const APPS: TableDefinition<&str, &[u8]> = TableDefinition::new("apps");

/// Deploy events keyed by `{event_id}`.
pub const DEPLOY_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deploy_events");

/// Every deploy event of an app, in timestamp order.
pub const EVENTS_BY_APP: TableDefinition<&str, &str> =
    TableDefinition::new("deploy_events_by_app");

/// Unread deploy events of an app, in timestamp order.
pub const UNREAD_EVENTS: TableDefinition<&str, &str> =
    TableDefinition::new("unread_deploy_events");

const SEP: char = '\0';

/// Lower bound of the index range holding all entries for `app`.
pub(crate) fn app_range_start(app: &str) -> String {
    format!("{app}{SEP}")
}

/// Exclusive upper bound of the index range holding all entries for `app`.
pub(crate) fn app_range_end(app: &str) -> String {
    format!("{app}\u{1}")
}

/// Composite index key for one event.
pub(crate) fn event_index_key(app: &str, timestamp_micros: i64, id: &str) -> String {
    // Timestamps before the epoch never occur for stamped events; clamp so
    // the zero-padded form keeps sorting lexicographically.
    let micros = timestamp_micros.max(0) as u64;
    format!("{app}{SEP}{micros:020}{SEP}{id}")
}

//! launchpad-state — embedded state store for Launchpad.
//!
//! Backed by [redb](https://docs.rs/redb), records the lifetime window of
//! every deployed app and an append-only log of deploy events per app.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns,
//! keyed by their id. Two index tables keyed by
//! `{app}\0{timestamp_micros}\0{event_id}` give each app an ordered audit
//! trail and an ordered unread queue (at-least-once: an event stays in the
//! queue until `mark_read`).
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across threads and async tasks.

mod apps;
pub mod clock;
pub mod error;
mod events;
pub mod repository;
pub mod store;
pub mod tables;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StateError, StateResult};
pub use repository::{AppRepository, DeployEventRepository};
pub use store::StateStore;
pub use types::*;

//! App repository backed by the `apps` table.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use tracing::{debug, info};

use crate::error::{StateError, StateResult};
use crate::repository::AppRepository;
use crate::store::{StateStore, decode, encode, map_err};
use crate::tables::APPS;
use crate::types::App;

impl AppRepository for StateStore {
    fn add_app(&self, id: &str, ttl: DateTime<Utc>, repository: &str) -> StateResult<App> {
        let app = App {
            id: id.to_string(),
            repository: repository.to_string(),
            created_at: self.stamp.now(),
            expires_at: ttl,
            killed: false,
        };
        let value = encode(&app)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPS).map_err(map_err!(Table))?;
            if table.get(id).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::DuplicateKey(id.to_string()));
            }
            table
                .insert(id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(app = %id, expires_at = %app.expires_at, "app added");
        Ok(app)
    }

    fn update_app(&self, app: &App) -> StateResult<()> {
        let value = encode(app)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPS).map_err(map_err!(Table))?;
            if table.get(app.id.as_str()).map_err(map_err!(Read))?.is_none() {
                return Err(StateError::NotFound(app.id.clone()));
            }
            table
                .insert(app.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(app = %app.id, killed = app.killed, "app stored");
        Ok(())
    }

    fn get_app(&self, id: &str) -> StateResult<App> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => decode(guard.value()),
            None => Err(StateError::NotFound(id.to_string())),
        }
    }

    fn list_apps(&self) -> StateResult<Vec<App>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            results.push(decode(value.value())?);
        }
        Ok(results)
    }

    fn get_expired_apps(&self) -> StateResult<Vec<App>> {
        let now = self.stamp.now();
        let expired: Vec<App> = self
            .list_apps()?
            .into_iter()
            .filter(|app| app.is_expired_at(now))
            .collect();
        debug!(count = expired.len(), %now, "expired apps listed");
        Ok(expired)
    }

    fn kill_app(&self, app: &mut App) -> StateResult<()> {
        app.killed = true;
        self.update_app(app)?;
        info!(app = %app.id, "app killed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn store_at(now: DateTime<Utc>) -> (StateStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        let store = StateStore::open_in_memory()
            .unwrap()
            .with_clock(clock.clone());
        (store, clock)
    }

    // ── Create / fetch ─────────────────────────────────────────────

    #[test]
    fn add_app_then_get_is_alive() {
        let store = StateStore::open_in_memory().unwrap();
        let ttl = Utc::now() + Duration::hours(1);

        let added = store.add_app("app1", ttl, "git://x").unwrap();
        let fetched = store.get_app("app1").unwrap();

        assert_eq!(fetched, added);
        assert!(!fetched.killed);
        assert!(fetched.created_at <= Utc::now());
        assert_eq!(fetched.expires_at, ttl);
        assert_eq!(fetched.repository, "git://x");
    }

    #[test]
    fn add_app_twice_is_duplicate_key() {
        let store = StateStore::open_in_memory().unwrap();
        let ttl = Utc::now() + Duration::hours(1);

        store.add_app("app1", ttl, "git://x").unwrap();
        let err = store.add_app("app1", ttl, "git://y").unwrap_err();

        assert!(err.is_duplicate_key());
        // The first insert is untouched.
        assert_eq!(store.get_app("app1").unwrap().repository, "git://x");
    }

    #[test]
    fn get_missing_app_is_not_found() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_app("nope").unwrap_err().is_not_found());
    }

    // ── Update ─────────────────────────────────────────────────────

    #[test]
    fn update_app_replaces_whole_document() {
        let store = StateStore::open_in_memory().unwrap();
        let mut app = store
            .add_app("app1", Utc::now() + Duration::hours(1), "git://x")
            .unwrap();

        app.expires_at += Duration::hours(2);
        app.repository = "git://moved".into();
        store.update_app(&app).unwrap();

        assert_eq!(store.get_app("app1").unwrap(), app);
    }

    #[test]
    fn update_missing_app_is_not_found() {
        let store = StateStore::open_in_memory().unwrap();
        let now = Utc::now();
        let ghost = App {
            id: "ghost".into(),
            repository: "git://x".into(),
            created_at: now,
            expires_at: now,
            killed: false,
        };
        assert!(store.update_app(&ghost).unwrap_err().is_not_found());
        assert!(store.get_app("ghost").unwrap_err().is_not_found());
    }

    // ── Expiry / kill ──────────────────────────────────────────────

    #[test]
    fn expired_apps_are_exactly_past_deadline_and_alive() {
        let now = Utc::now();
        let (store, _clock) = store_at(now);

        store.add_app("past", now - Duration::hours(1), "git://a").unwrap();
        store.add_app("future", now + Duration::hours(1), "git://b").unwrap();
        store.add_app("boundary", now, "git://c").unwrap();
        let mut dead = store
            .add_app("dead", now - Duration::hours(2), "git://d")
            .unwrap();
        store.kill_app(&mut dead).unwrap();

        let ids: HashSet<String> = store
            .get_expired_apps()
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, HashSet::from(["past".to_string()]));
    }

    #[test]
    fn expiry_follows_the_clock() {
        let now = Utc::now();
        let (store, clock) = store_at(now);
        store.add_app("app1", now + Duration::minutes(5), "git://x").unwrap();

        assert!(store.get_expired_apps().unwrap().is_empty());
        clock.advance(Duration::minutes(6));
        assert_eq!(store.get_expired_apps().unwrap().len(), 1);
    }

    #[test]
    fn killed_app_never_reappears_in_expired_list() {
        let now = Utc::now();
        let (store, clock) = store_at(now);
        store.add_app("app1", now - Duration::seconds(1), "git://x").unwrap();

        let mut expired = store.get_expired_apps().unwrap();
        assert_eq!(expired.len(), 1);
        store.kill_app(&mut expired[0]).unwrap();
        assert!(expired[0].killed);

        clock.advance(Duration::days(1));
        assert!(store.get_expired_apps().unwrap().is_empty());
        assert!(store.get_app("app1").unwrap().killed);
    }

    #[test]
    fn kill_scenario() {
        let store = StateStore::open_in_memory().unwrap();
        let mut app = store
            .add_app("app1", Utc::now() + Duration::hours(1), "git://x")
            .unwrap();
        assert!(!store.get_app("app1").unwrap().killed);

        store.kill_app(&mut app).unwrap();
        assert!(store.get_app("app1").unwrap().killed);
    }

    #[test]
    fn double_kill_is_harmless() {
        let now = Utc::now();
        let (store, _clock) = store_at(now);
        store.add_app("app1", now - Duration::hours(1), "git://x").unwrap();

        // Two sweepers observe the same expired app.
        let mut first = store.get_expired_apps().unwrap().remove(0);
        let mut second = first.clone();
        store.kill_app(&mut first).unwrap();
        store.kill_app(&mut second).unwrap();

        assert!(store.get_app("app1").unwrap().killed);
        assert!(store.get_expired_apps().unwrap().is_empty());
    }

    #[test]
    fn kill_missing_app_is_not_found() {
        let now = Utc::now();
        let mut ghost = App {
            id: "ghost".into(),
            repository: "git://x".into(),
            created_at: now,
            expires_at: now,
            killed: false,
        };
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.kill_app(&mut ghost).unwrap_err().is_not_found());
    }

    #[test]
    fn list_apps_returns_all() {
        let store = StateStore::open_in_memory().unwrap();
        let ttl = Utc::now() + Duration::hours(1);
        for id in ["a", "b", "c"] {
            store.add_app(id, ttl, "git://x").unwrap();
        }
        assert_eq!(store.list_apps().unwrap().len(), 3);
    }
}

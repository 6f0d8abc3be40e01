//! SQLite-backed local storage for signed-out use.
//!
//! A small key/value table holding JSON values: recent searches, guest
//! favorites and the guest unit preference.

use std::path::Path;

use breezy_core::UnitSystem;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Most recent searches kept.
pub const MAX_HISTORY: usize = 5;

const HISTORY_KEY: &str = "searchHistory";
const GUEST_FAVORITES_KEY: &str = "guestFavorites";
const GUEST_UNITS_KEY: &str = "unitSystem";

pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!("Discarding unreadable local value {:?}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value).map_err(|e| StoreError::decode(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Recent searches, newest first.
    pub fn search_history(&self) -> StoreResult<Vec<String>> {
        Ok(self.get(HISTORY_KEY)?.unwrap_or_default())
    }

    /// Put `query` at the front of the history, dropping any earlier copy and
    /// anything past [`MAX_HISTORY`]. Blank queries are ignored.
    pub fn record_search(&self, query: &str) -> StoreResult<Vec<String>> {
        let query = query.trim();
        let mut history = self.search_history()?;
        if query.is_empty() {
            return Ok(history);
        }

        history.retain(|q| q != query);
        history.insert(0, query.to_string());
        history.truncate(MAX_HISTORY);

        self.set(HISTORY_KEY, &history)?;
        Ok(history)
    }

    pub fn clear_history(&self) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![HISTORY_KEY])?;
        Ok(())
    }

    pub fn guest_favorites(&self) -> StoreResult<Vec<String>> {
        Ok(self.get(GUEST_FAVORITES_KEY)?.unwrap_or_default())
    }

    /// Returns false when the location was already a favorite.
    pub fn add_guest_favorite(&self, location: &str) -> StoreResult<bool> {
        let mut favorites = self.guest_favorites()?;
        if favorites.iter().any(|f| f == location) {
            return Ok(false);
        }
        favorites.push(location.to_string());
        self.set(GUEST_FAVORITES_KEY, &favorites)?;
        Ok(true)
    }

    /// Returns false when the location was not a favorite.
    pub fn remove_guest_favorite(&self, location: &str) -> StoreResult<bool> {
        let mut favorites = self.guest_favorites()?;
        let before = favorites.len();
        favorites.retain(|f| f != location);
        if favorites.len() == before {
            return Ok(false);
        }
        self.set(GUEST_FAVORITES_KEY, &favorites)?;
        Ok(true)
    }

    pub fn guest_unit_system(&self) -> StoreResult<Option<UnitSystem>> {
        self.get(GUEST_UNITS_KEY)
    }

    pub fn set_guest_unit_system(&self, units: UnitSystem) -> StoreResult<()> {
        self.set(GUEST_UNITS_KEY, &units)
    }
}

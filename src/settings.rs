//! Typed settings store backed by the settings table.
//!
//! One get/set contract for every consumer, replacing the legacy pattern of
//! per-page helper functions each with their own fallback behavior.

use rusqlite::params;

use crate::db::{Database, Result};

pub struct SettingsStore<'a> {
    db: &'a Database,
}

impl<'a> SettingsStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Raw string value for a key. None if unset.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.db.conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Boolean value: "1"/"true" and "0"/"false" parse, anything else is None.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key)?.and_then(|v| match v.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }))
    }

    /// Integer value; unparseable stored text is None.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get(key)?.and_then(|v| v.parse().ok()))
    }

    /// Set or overwrite a key.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.conn.execute(
            "INSERT INTO settings (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    /// All settings, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStore::new(&db);

        assert!(settings.get("site_name").unwrap().is_none());
        settings.set("site_name", "Backtrack FM").unwrap();
        assert_eq!(
            settings.get("site_name").unwrap().as_deref(),
            Some("Backtrack FM")
        );
    }

    #[test]
    fn test_set_overwrites() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStore::new(&db);

        settings.set("smtp_port", "25").unwrap();
        settings.set("smtp_port", "587").unwrap();
        assert_eq!(settings.get_i64("smtp_port").unwrap(), Some(587));
        assert_eq!(settings.list().unwrap().len(), 1);
    }

    #[test]
    fn test_typed_getters() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStore::new(&db);

        settings.set("email_enabled", "1").unwrap();
        settings.set("queue_batch", "50").unwrap();
        settings.set("theme", "dark").unwrap();

        assert_eq!(settings.get_bool("email_enabled").unwrap(), Some(true));
        assert_eq!(settings.get_i64("queue_batch").unwrap(), Some(50));
        assert_eq!(settings.get_bool("theme").unwrap(), None);
        assert_eq!(settings.get_i64("theme").unwrap(), None);
        assert_eq!(settings.get_bool("missing").unwrap(), None);
    }

    #[test]
    fn test_list_sorted() {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStore::new(&db);

        settings.set("b", "2").unwrap();
        settings.set("a", "1").unwrap();
        let all = settings.list().unwrap();
        assert_eq!(all[0].0, "a");
        assert_eq!(all[1].0, "b");
    }
}

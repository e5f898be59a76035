use crate::model::{Deal, StorageError};
use crate::utils::parse_datetime;
use chrono::{Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// Per-query cache of computed deals.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the cache database and its table.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS product_cache (
                query TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self { conn })
    }

    /// Cached deals for `query` if they were saved less than `max_age` ago.
    /// An empty deal list counts as a miss so the item is looked up again.
    pub fn get_cached(&self, query: &str, max_age: Duration) -> Result<Option<Vec<Deal>>, StorageError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT data, timestamp FROM product_cache WHERE query = ?1",
                params![query],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((data, timestamp)) = row else {
            return Ok(None);
        };
        let saved_at = parse_datetime(&timestamp)
            .ok_or_else(|| StorageError::Timestamp(timestamp.clone()))?;
        if Utc::now().signed_duration_since(saved_at) >= max_age {
            return Ok(None);
        }

        let deals: Vec<Deal> = serde_json::from_str(&data)?;
        if deals.is_empty() {
            return Ok(None);
        }
        Ok(Some(deals))
    }

    /// Inserts or replaces the deals for `query`, stamped with the current time.
    pub fn save(&self, query: &str, deals: &[Deal]) -> Result<(), StorageError> {
        let data = serde_json::to_string(deals)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO product_cache (query, data, timestamp) VALUES (?1, ?2, ?3)",
            params![query, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Deletes rows older than `max_age`, returning how many were removed.
    pub fn purge_expired(&self, max_age: Duration) -> Result<usize, StorageError> {
        let mut stmt = self.conn.prepare("SELECT query, timestamp FROM product_cache")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let now = Utc::now();
        let mut stale = Vec::new();
        for row in rows {
            let (query, timestamp) = row?;
            let expired = match parse_datetime(&timestamp) {
                Some(saved_at) => now.signed_duration_since(saved_at) >= max_age,
                None => true,
            };
            if expired {
                stale.push(query);
            }
        }

        for query in &stale {
            self.conn
                .execute("DELETE FROM product_cache WHERE query = ?1", params![query])?;
        }
        Ok(stale.len())
    }

    #[cfg(test)]
    fn set_timestamp(&self, query: &str, timestamp: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE product_cache SET timestamp = ?1 WHERE query = ?2",
            params![timestamp, query],
        )?;
        Ok(())
    }
}

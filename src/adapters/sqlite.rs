//! Typed accessor over SQLite-backed vendor containers (some scanner
//! formats ship a small SQLite index alongside their tiled image data).
//!
//! This backs no complete vendor decoder -- only its shape constrains the
//! core, per the roster in `crate::format::detect`. It exposes a narrow
//! key/value getter over a single table rather than a general SQL surface.

use rusqlite::Connection;

use crate::error::SlideError;

/// A thin typed getter over one SQLite database's `properties(key, value)`
/// table, the common shape vendor index databases use for slide metadata.
pub struct SqliteProperties {
    conn: Connection,
}

impl SqliteProperties {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, SlideError> {
        let conn = Connection::open(path).map_err(|e| SlideError::BadData {
            context: "Couldn't open SQLite slide index".to_string(),
            detail: e.to_string(),
        })?;
        Ok(SqliteProperties { conn })
    }

    /// Read a single string value from a `properties(key, value)` table.
    /// Returns `Ok(None)` if the table or key doesn't exist.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, SlideError> {
        let result = self.conn.query_row(
            "SELECT value FROM properties WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SlideError::BadData {
                context: "Couldn't read SQLite slide property".to_string(),
                detail: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteProperties {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE properties (key TEXT PRIMARY KEY, value TEXT)", [])
            .unwrap();
        conn.execute("INSERT INTO properties (key, value) VALUES ('vendor', 'acme')", [])
            .unwrap();
        SqliteProperties { conn }
    }

    #[test]
    fn reads_existing_key() {
        let props = fixture();
        assert_eq!(props.get_string("vendor").unwrap(), Some("acme".to_string()));
    }

    #[test]
    fn missing_key_is_none_not_error() {
        let props = fixture();
        assert_eq!(props.get_string("nope").unwrap(), None);
    }
}

//! Embedded SQLite store shared by the modules

mod links;
mod memos;
mod pictures;
mod quotes;

pub use links::Link;
pub use memos::Memo;
pub use pictures::Picture;
pub use quotes::Quote;

use chrono::{Local, NaiveDateTime, TimeZone};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::path::Path;

use crate::application::errors::StorageError;

const STORED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y @ %H:%M";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file, creating its parent directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!("Opening database {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS Memo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL DEFAULT (datetime('now')),
                user_to TEXT NOT NULL,
                user_from TEXT NOT NULL,
                message TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS Link (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL DEFAULT (datetime('now')),
                user TEXT NOT NULL,
                url TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS Picture (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL DEFAULT (datetime('now')),
                tag TEXT NOT NULL,
                url TEXT NOT NULL,
                nick TEXT NOT NULL,
                nsfw INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS Quote (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL DEFAULT (datetime('now')),
                user TEXT NOT NULL,
                content TEXT NOT NULL,
                sender TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memo_user_to ON Memo(user_to);
            CREATE INDEX IF NOT EXISTS idx_link_url ON Link(url);
            CREATE INDEX IF NOT EXISTS idx_picture_tag ON Picture(tag);
            CREATE INDEX IF NOT EXISTS idx_quote_user ON Quote(user);",
        )?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

/// Render a stored UTC timestamp in local time as `dd/mm/YYYY @ HH:MM`
pub fn format_date(stored: &str) -> String {
    match NaiveDateTime::parse_from_str(stored, STORED_DATE_FORMAT) {
        Ok(naive) => Local.from_utc_datetime(&naive).format(DISPLAY_DATE_FORMAT).to_string(),
        Err(_) => stored.to_string(),
    }
}

/// Wrap a user supplied fragment for a `LIKE` clause
pub(crate) fn like_pattern(fragment: &str) -> String {
    format!("%{}%", fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("goxxx-db-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("db.sqlite");

        let db = Database::open(&path).unwrap();
        drop(db);

        assert!(path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_format_date() {
        let rendered = format_date("2020-03-04 05:06:07");
        // Local offset varies; only the shape is fixed
        assert_eq!(rendered.len(), "04/03/2020 @ 05:06".len());
        assert_eq!(&rendered[2..3], "/");
        assert_eq!(&rendered[10..13], " @ ");

        assert_eq!(format_date("garbage"), "garbage");
    }

    #[test]
    fn test_tables_exist() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN ('Memo', 'Link', 'Picture', 'Quote')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }
}

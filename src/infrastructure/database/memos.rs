use rusqlite::params;

use super::{format_date, Database};
use crate::application::errors::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct Memo {
    pub id: i64,
    pub date: String,
    pub user_to: String,
    pub user_from: String,
    pub message: String,
}

impl Memo {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let date: String = row.get(1)?;
        Ok(Self {
            id: row.get(0)?,
            date: format_date(&date),
            user_to: row.get(2)?,
            user_from: row.get(3)?,
            message: row.get(4)?,
        })
    }
}

impl Database {
    pub fn add_memo(&self, user_to: &str, user_from: &str, message: &str) -> Result<i64, StorageError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO Memo (user_to, user_from, message) VALUES (?1, ?2, ?3)",
            params![user_to, user_from, message],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Memos waiting for `user_to`, oldest first
    pub fn memos_for(&self, user_to: &str) -> Result<Vec<Memo>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, date, user_to, user_from, message FROM Memo WHERE user_to = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([user_to], Memo::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Memos left by `user_from` that nobody has read yet
    pub fn memos_from(&self, user_from: &str) -> Result<Vec<Memo>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, date, user_to, user_from, message FROM Memo WHERE user_from = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([user_from], Memo::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_memo(&self, id: i64) -> Result<bool, StorageError> {
        let rows = self.conn().execute("DELETE FROM Memo WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

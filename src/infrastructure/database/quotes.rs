use rusqlite::{params, OptionalExtension};

use super::{format_date, like_pattern, Database};
use crate::application::errors::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub user: String,
    pub content: String,
    pub date: String,
    pub sender: String,
}

impl Quote {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let date: String = row.get(2)?;
        Ok(Self {
            user: row.get(0)?,
            content: row.get(1)?,
            date: format_date(&date),
            sender: row.get(3)?,
        })
    }
}

impl Database {
    pub fn add_quote(&self, user: &str, content: &str, sender: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO Quote (user, content, sender) VALUES (?1, ?2, ?3)",
            params![user, content, sender],
        )?;
        Ok(())
    }

    pub fn quote_exists(&self, user: &str, content: &str) -> Result<bool, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT count(*) FROM Quote WHERE user = ?1 AND content = ?2",
            params![user, content],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Quotes of `user`, filtered on `fragment` when given
    pub fn quotes_of(&self, user: &str, fragment: Option<&str>) -> Result<Vec<Quote>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user, content, date, sender FROM Quote WHERE user = ?1 AND content LIKE ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![user, like_pattern(fragment.unwrap_or_default())],
            Quote::from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn quotes_like(&self, fragment: &str) -> Result<Vec<Quote>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user, content, date, sender FROM Quote WHERE content LIKE ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([like_pattern(fragment)], Quote::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// A random quote saved on this day, one year ago (local calendar)
    pub fn quote_from_last_year(&self) -> Result<Option<Quote>, StorageError> {
        let quote = self
            .conn()
            .query_row(
                "SELECT user, content, date, sender FROM Quote
                 WHERE date(date, 'localtime') = date('now', 'localtime', '-1 year')
                 ORDER BY RANDOM() LIMIT 1",
                [],
                Quote::from_row,
            )
            .optional()?;
        Ok(quote)
    }

    pub fn delete_quotes(&self, user: &str, fragment: &str) -> Result<usize, StorageError> {
        let rows = self.conn().execute(
            "DELETE FROM Quote WHERE user = ?1 AND content LIKE ?2",
            params![user, like_pattern(fragment)],
        )?;
        Ok(rows)
    }
}

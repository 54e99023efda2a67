use rusqlite::{params, OptionalExtension};

use super::{format_date, like_pattern, Database};
use crate::application::errors::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub user: String,
    pub date: String,
    pub url: String,
    pub title: String,
}

impl Link {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let date: String = row.get(1)?;
        Ok(Self {
            user: row.get(0)?,
            date: format_date(&date),
            url: row.get(2)?,
            title: row.get(3)?,
        })
    }
}

impl Database {
    pub fn add_link(&self, user: &str, url: &str, title: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO Link (user, url, title) VALUES (?1, ?2, ?3)",
            params![user, url, title],
        )?;
        Ok(())
    }

    /// First record of an exact url
    pub fn find_link(&self, url: &str) -> Result<Option<Link>, StorageError> {
        let link = self
            .conn()
            .query_row(
                "SELECT user, date, url, title FROM Link WHERE url = ?1 ORDER BY id LIMIT 1",
                [url],
                Link::from_row,
            )
            .optional()?;
        Ok(link)
    }

    pub fn links_by_url(&self, fragment: &str) -> Result<Vec<Link>, StorageError> {
        self.search_links("SELECT user, date, url, title FROM Link WHERE url LIKE ?1 ORDER BY id", fragment)
    }

    pub fn links_by_title(&self, fragment: &str) -> Result<Vec<Link>, StorageError> {
        self.search_links("SELECT user, date, url, title FROM Link WHERE title LIKE ?1 ORDER BY id", fragment)
    }

    fn search_links(&self, sql: &str, fragment: &str) -> Result<Vec<Link>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([like_pattern(fragment)], Link::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

use rusqlite::params;

use super::{like_pattern, Database};
use crate::application::errors::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub tag: String,
    pub url: String,
    pub nsfw: bool,
}

impl Database {
    pub fn add_picture(&self, tag: &str, url: &str, nick: &str, nsfw: bool) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO Picture (tag, url, nick, nsfw) VALUES (?1, ?2, ?3, ?4)",
            params![tag, url, nick, nsfw],
        )?;
        Ok(())
    }

    pub fn picture_exists(&self, tag: &str, url: &str) -> Result<bool, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT count(*) FROM Picture WHERE tag = ?1 AND url = ?2",
            params![tag, url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn picture_count(&self, tag: &str) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT count(url) FROM Picture WHERE tag = ?1", [tag], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StorageError::InvalidValue(format!("picture count {}", count)))
    }

    pub fn pictures_like(&self, tag: &str) -> Result<Vec<Picture>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT tag, url, nsfw FROM Picture WHERE tag LIKE ?1 ORDER BY id")?;
        let rows = stmt.query_map([like_pattern(tag)], |row| {
            Ok(Picture {
                tag: row.get(0)?,
                url: row.get(1)?,
                nsfw: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_picture(&self, tag: &str, url: &str) -> Result<bool, StorageError> {
        let rows = self
            .conn()
            .execute("DELETE FROM Picture WHERE tag = ?1 AND url = ?2", params![tag, url])?;
        Ok(rows > 0)
    }
}

//! Tag rows

use crate::domain::{NewTag, Tag, TagId};
use crate::error::{Result, TaxonError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TAG_COLUMNS: &str = "id, name, name_key, tag_type, description, is_featured, is_private, \
                           created_at, updated_at";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        name_key: row.get(2)?,
        tag_type: row.get(3)?,
        description: row.get(4)?,
        is_featured: row.get(5)?,
        is_private: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Tag row access
pub trait TagRows {
    fn get_tag(&self, id: TagId) -> Result<Option<Tag>>;

    /// Like [`TagRows::get_tag`] but a missing row is a `NotFound` error
    fn require_tag(&self, id: TagId) -> Result<Tag>;

    fn find_tag_by_key(&self, name_key: &str) -> Result<Option<Tag>>;

    /// Atomic insert-or-return-existing keyed on `name_key`.
    ///
    /// Returns the stored row and whether this call created it. Two callers
    /// racing on the same key both get the single surviving row.
    fn insert_tag_or_get(&self, new_tag: &NewTag) -> Result<(Tag, bool)>;

    /// All tags ordered by id
    fn list_tags(&self) -> Result<Vec<Tag>>;

    fn set_tag_description(&self, id: TagId, description: Option<&str>) -> Result<()>;

    /// Delete the row; edges and content associations cascade
    fn delete_tag_row(&self, id: TagId) -> Result<bool>;
}

impl TagRows for Connection {
    fn get_tag(&self, id: TagId) -> Result<Option<Tag>> {
        let sql = format!("SELECT {} FROM tags WHERE id = ?1", TAG_COLUMNS);
        Ok(self.query_row(&sql, [id], tag_from_row).optional()?)
    }

    fn require_tag(&self, id: TagId) -> Result<Tag> {
        self.get_tag(id)?
            .ok_or_else(|| TaxonError::tag_not_found(id))
    }

    fn find_tag_by_key(&self, name_key: &str) -> Result<Option<Tag>> {
        let sql = format!("SELECT {} FROM tags WHERE name_key = ?1", TAG_COLUMNS);
        Ok(self.query_row(&sql, [name_key], tag_from_row).optional()?)
    }

    fn insert_tag_or_get(&self, new_tag: &NewTag) -> Result<(Tag, bool)> {
        let now = Utc::now();
        let inserted = self.execute(
            "INSERT INTO tags (name, name_key, tag_type, description, is_featured, is_private, \
                               created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(name_key) DO NOTHING",
            params![
                new_tag.name,
                new_tag.name_key,
                new_tag.tag_type,
                new_tag.description,
                new_tag.is_featured,
                new_tag.is_private,
                now,
            ],
        )?;

        let tag = self
            .find_tag_by_key(&new_tag.name_key)?
            .ok_or_else(|| TaxonError::tag_not_found(&new_tag.name_key))?;
        Ok((tag, inserted > 0))
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let sql = format!("SELECT {} FROM tags ORDER BY id", TAG_COLUMNS);
        let mut stmt = self.prepare(&sql)?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    fn set_tag_description(&self, id: TagId, description: Option<&str>) -> Result<()> {
        let updated = self.execute(
            "UPDATE tags SET description = ?1, updated_at = ?2 WHERE id = ?3",
            params![description, Utc::now(), id],
        )?;
        if updated == 0 {
            return Err(TaxonError::tag_not_found(id));
        }
        Ok(())
    }

    fn delete_tag_row(&self, id: TagId) -> Result<bool> {
        Ok(self.execute("DELETE FROM tags WHERE id = ?1", [id])? > 0)
    }
}

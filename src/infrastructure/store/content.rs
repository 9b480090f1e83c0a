//! Content items and their tag associations

use crate::domain::{ContentId, ContentItem, TagId};
use crate::error::{Result, TaxonError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

fn content_from_row(row: &Row<'_>) -> rusqlite::Result<ContentItem> {
    Ok(ContentItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        metadata: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// `needle` must already be lowercase
fn item_contains(item: &ContentItem, needle: &str) -> bool {
    [Some(&item.title), item.description.as_ref(), item.metadata.as_ref()]
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(needle))
}

/// Content search and tag association access
pub trait ContentIndex {
    fn insert_content(
        &self,
        title: &str,
        description: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<ContentItem>;

    fn get_content(&self, id: ContentId) -> Result<Option<ContentItem>>;

    /// Items whose title, description or metadata contains `needle`,
    /// compared case-insensitively
    fn find_content_containing(&self, needle: &str) -> Result<Vec<ContentItem>>;

    /// Attach a tag; returns false when the association already existed
    fn tag_content(&self, content: ContentId, tag: TagId) -> Result<bool>;

    fn content_tag_ids(&self, content: ContentId) -> Result<BTreeSet<TagId>>;

    fn content_ids_for_tag(&self, tag: TagId) -> Result<Vec<ContentId>>;

    fn content_count_for_tag(&self, tag: TagId) -> Result<usize>;

    /// Move every association of `from` onto `to`, skipping content already
    /// tagged with `to`. Returns how many associations were added to `to`.
    fn transfer_content_tags(&self, from: TagId, to: TagId) -> Result<usize>;

    fn delete_content_tags_for(&self, tag: TagId) -> Result<usize>;
}

impl ContentIndex for Connection {
    fn insert_content(
        &self,
        title: &str,
        description: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<ContentItem> {
        if title.trim().is_empty() {
            return Err(TaxonError::Validation(
                "Content title cannot be empty".to_string(),
            ));
        }
        self.execute(
            "INSERT INTO content_items (title, description, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![title, description, metadata, Utc::now()],
        )?;
        let id = ContentId(self.last_insert_rowid());
        self.get_content(id)?.ok_or_else(|| TaxonError::NotFound {
            entity: "Content",
            id: id.to_string(),
        })
    }

    fn get_content(&self, id: ContentId) -> Result<Option<ContentItem>> {
        Ok(self
            .query_row(
                "SELECT id, title, description, metadata, created_at
                 FROM content_items WHERE id = ?1",
                [id],
                content_from_row,
            )
            .optional()?)
    }

    fn find_content_containing(&self, needle: &str) -> Result<Vec<ContentItem>> {
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        // SQLite's lower() only folds ASCII
        if !needle.is_ascii() {
            let needle = needle.to_lowercase();
            let mut stmt = self.prepare_cached(
                "SELECT id, title, description, metadata, created_at
                 FROM content_items ORDER BY id",
            )?;
            let items = stmt
                .query_map([], content_from_row)?
                .filter(|item| match item {
                    Ok(item) => item_contains(item, &needle),
                    Err(_) => true,
                })
                .collect::<rusqlite::Result<Vec<_>>>()?;
            return Ok(items);
        }

        let mut stmt = self.prepare_cached(
            "SELECT id, title, description, metadata, created_at
             FROM content_items
             WHERE instr(lower(title), lower(?1)) > 0
                OR instr(lower(coalesce(description, '')), lower(?1)) > 0
                OR instr(lower(coalesce(metadata, '')), lower(?1)) > 0
             ORDER BY id",
        )?;
        let items = stmt
            .query_map([needle], content_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn tag_content(&self, content: ContentId, tag: TagId) -> Result<bool> {
        let inserted = self.execute(
            "INSERT OR IGNORE INTO content_tags (content_id, tag_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![content, tag, Utc::now()],
        )?;
        Ok(inserted > 0)
    }

    fn content_tag_ids(&self, content: ContentId) -> Result<BTreeSet<TagId>> {
        let mut stmt = self.prepare_cached("SELECT tag_id FROM content_tags WHERE content_id = ?1")?;
        let ids = stmt
            .query_map([content], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<TagId>>>()?;
        Ok(ids)
    }

    fn content_ids_for_tag(&self, tag: TagId) -> Result<Vec<ContentId>> {
        let mut stmt = self.prepare_cached(
            "SELECT content_id FROM content_tags WHERE tag_id = ?1 ORDER BY content_id",
        )?;
        let ids = stmt
            .query_map([tag], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<ContentId>>>()?;
        Ok(ids)
    }

    fn content_count_for_tag(&self, tag: TagId) -> Result<usize> {
        let count: i64 = self.query_row(
            "SELECT COUNT(*) FROM content_tags WHERE tag_id = ?1",
            [tag],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn transfer_content_tags(&self, from: TagId, to: TagId) -> Result<usize> {
        let moved = self.execute(
            "INSERT OR IGNORE INTO content_tags (content_id, tag_id, created_at)
             SELECT content_id, ?1, created_at FROM content_tags WHERE tag_id = ?2",
            [to, from],
        )?;
        self.delete_content_tags_for(from)?;
        Ok(moved)
    }

    fn delete_content_tags_for(&self, tag: TagId) -> Result<usize> {
        Ok(self.execute("DELETE FROM content_tags WHERE tag_id = ?1", [tag])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTag;
    use crate::infrastructure::store::{SqliteStore, TagRows};

    fn tag(store: &SqliteStore, name: &str) -> TagId {
        let new_tag = NewTag {
            name: name.to_string(),
            name_key: name.to_lowercase(),
            ..Default::default()
        };
        store
            .write(|tx| tx.insert_tag_or_get(&new_tag))
            .unwrap()
            .0
            .id
    }

    #[test]
    fn test_find_content_is_case_insensitive_across_fields() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .write(|tx| {
                tx.insert_content("Intro to GraphQL", None, None)?;
                tx.insert_content("Untitled", Some("uses graphql subscriptions"), None)?;
                tx.insert_content("Other", None, Some(r#"{"topic":"GRAPHQL"}"#))?;
                tx.insert_content("Unrelated", Some("REST only"), None)?;
                Ok(())
            })
            .unwrap();

        let found = store.read(|c| c.find_content_containing("GraphQL")).unwrap();
        let titles: Vec<&str> = found.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro to GraphQL", "Untitled", "Other"]);
    }

    #[test]
    fn test_find_content_folds_non_ascii_case() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .write(|tx| {
                tx.insert_content("ÜBERSICHT der Themen", None, None)?;
                tx.insert_content("Notes", Some("kurze übersicht"), None)?;
                tx.insert_content("Ubersicht", None, None)?;
                Ok(())
            })
            .unwrap();

        let found = store.read(|c| c.find_content_containing("Übersicht")).unwrap();
        let titles: Vec<&str> = found.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["ÜBERSICHT der Themen", "Notes"]);
    }

    #[test]
    fn test_tag_content_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let rust = tag(&store, "Rust");
        let item = store.write(|tx| tx.insert_content("Ownership", None, None)).unwrap();
        assert!(store.write(|tx| tx.tag_content(item.id, rust)).unwrap());
        assert!(!store.write(|tx| tx.tag_content(item.id, rust)).unwrap());
        assert_eq!(store.read(|c| c.content_count_for_tag(rust)).unwrap(), 1);
    }

    #[test]
    fn test_transfer_skips_existing_associations() {
        let store = SqliteStore::in_memory().unwrap();
        let loser = tag(&store, "js");
        let winner = tag(&store, "JavaScript");
        let (shared, only_loser) = store
            .write(|tx| {
                let shared = tx.insert_content("shared", None, None)?;
                let only_loser = tx.insert_content("only loser", None, None)?;
                tx.tag_content(shared.id, loser)?;
                tx.tag_content(shared.id, winner)?;
                tx.tag_content(only_loser.id, loser)?;
                Ok((shared.id, only_loser.id))
            })
            .unwrap();

        let moved = store
            .write(|tx| tx.transfer_content_tags(loser, winner))
            .unwrap();
        assert_eq!(moved, 1);
        assert_eq!(
            store.read(|c| c.content_ids_for_tag(winner)).unwrap(),
            vec![shared, only_loser]
        );
        assert!(store.read(|c| c.content_ids_for_tag(loser)).unwrap().is_empty());
    }

    #[test]
    fn test_empty_title_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store
            .write(|tx| tx.insert_content("  ", None, None))
            .unwrap_err();
        assert!(matches!(err, TaxonError::Validation(_)));
    }
}

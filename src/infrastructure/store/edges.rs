//! Hierarchy edge rows

use crate::domain::{HierarchyEdge, TagId};
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<HierarchyEdge> {
    Ok(HierarchyEdge {
        parent_id: row.get(0)?,
        child_id: row.get(1)?,
        relationship_type: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Edge row access. No acyclicity checks happen at this level.
pub trait EdgeRows {
    fn get_edge(&self, parent: TagId, child: TagId) -> Result<Option<HierarchyEdge>>;

    /// Insert unless the `(parent, child)` pair already exists
    fn insert_edge(&self, edge: &HierarchyEdge) -> Result<bool>;

    fn delete_edge(&self, parent: TagId, child: TagId) -> Result<bool>;

    /// Edges with `parent_id = parent`
    fn edges_from(&self, parent: TagId) -> Result<Vec<HierarchyEdge>>;

    /// Edges with `child_id = child`
    fn edges_to(&self, child: TagId) -> Result<Vec<HierarchyEdge>>;

    fn parent_ids(&self, child: TagId) -> Result<BTreeSet<TagId>>;

    fn child_ids(&self, parent: TagId) -> Result<BTreeSet<TagId>>;

    /// Remove every edge where `id` is parent or child
    fn delete_edges_touching(&self, id: TagId) -> Result<usize>;

    /// Tags that are nobody's child
    fn root_ids(&self) -> Result<Vec<TagId>>;
}

impl EdgeRows for Connection {
    fn get_edge(&self, parent: TagId, child: TagId) -> Result<Option<HierarchyEdge>> {
        Ok(self
            .query_row(
                "SELECT parent_id, child_id, relationship_type, created_at
                 FROM tag_edges WHERE parent_id = ?1 AND child_id = ?2",
                [parent, child],
                edge_from_row,
            )
            .optional()?)
    }

    fn insert_edge(&self, edge: &HierarchyEdge) -> Result<bool> {
        let inserted = self.execute(
            "INSERT OR IGNORE INTO tag_edges (parent_id, child_id, relationship_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                edge.parent_id,
                edge.child_id,
                edge.relationship_type,
                edge.created_at
            ],
        )?;
        Ok(inserted > 0)
    }

    fn delete_edge(&self, parent: TagId, child: TagId) -> Result<bool> {
        let deleted = self.execute(
            "DELETE FROM tag_edges WHERE parent_id = ?1 AND child_id = ?2",
            [parent, child],
        )?;
        Ok(deleted > 0)
    }

    fn edges_from(&self, parent: TagId) -> Result<Vec<HierarchyEdge>> {
        let mut stmt = self.prepare_cached(
            "SELECT parent_id, child_id, relationship_type, created_at
             FROM tag_edges WHERE parent_id = ?1 ORDER BY child_id",
        )?;
        let edges = stmt
            .query_map([parent], edge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn edges_to(&self, child: TagId) -> Result<Vec<HierarchyEdge>> {
        let mut stmt = self.prepare_cached(
            "SELECT parent_id, child_id, relationship_type, created_at
             FROM tag_edges WHERE child_id = ?1 ORDER BY parent_id",
        )?;
        let edges = stmt
            .query_map([child], edge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn parent_ids(&self, child: TagId) -> Result<BTreeSet<TagId>> {
        let mut stmt = self.prepare_cached("SELECT parent_id FROM tag_edges WHERE child_id = ?1")?;
        let ids = stmt
            .query_map([child], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<TagId>>>()?;
        Ok(ids)
    }

    fn child_ids(&self, parent: TagId) -> Result<BTreeSet<TagId>> {
        let mut stmt = self.prepare_cached("SELECT child_id FROM tag_edges WHERE parent_id = ?1")?;
        let ids = stmt
            .query_map([parent], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<TagId>>>()?;
        Ok(ids)
    }

    fn delete_edges_touching(&self, id: TagId) -> Result<usize> {
        Ok(self.execute(
            "DELETE FROM tag_edges WHERE parent_id = ?1 OR child_id = ?1",
            [id],
        )?)
    }

    fn root_ids(&self) -> Result<Vec<TagId>> {
        let mut stmt = self.prepare(
            "SELECT id FROM tags t
             WHERE NOT EXISTS (SELECT 1 FROM tag_edges e WHERE e.child_id = t.id)
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<TagId>>>()?;
        Ok(ids)
    }
}

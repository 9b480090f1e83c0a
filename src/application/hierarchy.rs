//! Hierarchy graph use cases
//!
//! Maintains the tag DAG. Every walk uses an explicit worklist plus a visited
//! set, so deep or diamond-shaped graphs neither recurse nor revisit shared
//! ancestors.

use crate::application::cache::NameCache;
use crate::domain::{HierarchyEdge, RelationshipType, Tag, TagId};
use crate::error::{Result, TaxonError};
use crate::infrastructure::{ContentIndex, EdgeRows, NormalizationRows, SqliteStore, TagRows};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// One row of a rendered subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeLine {
    pub depth: usize,
    pub tag: Tag,
    /// Already shown through another parent; its children are not repeated
    pub repeated: bool,
}

/// Service over the tag DAG
#[derive(Debug, Clone)]
pub struct HierarchyGraph {
    store: Arc<SqliteStore>,
    cache: Arc<NameCache>,
}

impl HierarchyGraph {
    pub fn new(store: Arc<SqliteStore>, cache: Arc<NameCache>) -> Self {
        HierarchyGraph { store, cache }
    }

    /// Add `parent -> child`.
    ///
    /// Returns `false` when the edge already exists. The cycle check and the
    /// insert share one immediate transaction, so concurrent insertions cannot
    /// jointly close a loop.
    ///
    /// # Errors
    ///
    /// - `SelfReference` when `parent == child`
    /// - `NotFound` when either tag is missing
    /// - `Cycle` with the closed path when the edge would create a cycle
    pub fn add_edge(
        &self,
        parent: TagId,
        child: TagId,
        relationship_type: RelationshipType,
    ) -> Result<bool> {
        let added = self
            .store
            .write(|tx| add_edge_in(tx, parent, child, relationship_type))?;
        if added {
            info!(%parent, %child, %relationship_type, "added edge");
        } else {
            debug!(%parent, %child, "edge already present");
        }
        Ok(added)
    }

    pub fn remove_edge(&self, parent: TagId, child: TagId) -> Result<bool> {
        let removed = self.store.write(|tx| tx.delete_edge(parent, child))?;
        if removed {
            info!(%parent, %child, "removed edge");
        }
        Ok(removed)
    }

    /// Direct parents
    pub fn get_parents(&self, id: TagId) -> Result<BTreeSet<TagId>> {
        self.store.read(|conn| {
            conn.require_tag(id)?;
            conn.parent_ids(id)
        })
    }

    /// Direct children
    pub fn get_children(&self, id: TagId) -> Result<BTreeSet<TagId>> {
        self.store.read(|conn| {
            conn.require_tag(id)?;
            conn.child_ids(id)
        })
    }

    /// Every tag reachable upward from `id`, each once
    pub fn get_all_ancestors(&self, id: TagId) -> Result<BTreeSet<TagId>> {
        self.store.read(|conn| {
            conn.require_tag(id)?;
            closure_in(conn, id, Direction::Up)
        })
    }

    /// Every tag reachable downward from `id`, each once
    pub fn get_all_descendants(&self, id: TagId) -> Result<BTreeSet<TagId>> {
        self.store.read(|conn| {
            conn.require_tag(id)?;
            closure_in(conn, id, Direction::Down)
        })
    }

    /// Whether adding `parent -> child` would close a cycle. Never mutates.
    pub fn would_create_cycle(&self, parent: TagId, child: TagId) -> Result<bool> {
        Ok(self.cycle_path(parent, child)?.is_some())
    }

    /// The loop `[child, .., parent, child]` that `parent -> child` would close
    pub fn cycle_path(&self, parent: TagId, child: TagId) -> Result<Option<Vec<TagId>>> {
        self.store.read(|conn| {
            conn.require_tag(parent)?;
            conn.require_tag(child)?;
            cycle_path_in(conn, parent, child)
        })
    }

    /// Tags without parents, ordered by id
    pub fn roots(&self) -> Result<Vec<Tag>> {
        self.store.read(|conn| {
            conn.root_ids()?
                .into_iter()
                .map(|id| conn.require_tag(id))
                .collect()
        })
    }

    /// Pre-order listing of the subtree under `id`
    pub fn subtree(&self, id: TagId) -> Result<Vec<TreeLine>> {
        self.store.read(|conn| {
            let mut lines = Vec::new();
            let mut shown = HashSet::new();
            let mut stack = vec![(id, 0usize)];

            while let Some((current, depth)) = stack.pop() {
                let tag = conn.require_tag(current)?;
                let repeated = !shown.insert(current);
                lines.push(TreeLine {
                    depth,
                    tag,
                    repeated,
                });
                if repeated {
                    continue;
                }
                // reversed so the lowest id is visited first
                for child in conn.child_ids(current)?.into_iter().rev() {
                    stack.push((child, depth + 1));
                }
            }

            Ok(lines)
        })
    }

    /// Delete a tag that has no children.
    ///
    /// Removes its edges, content associations and normalization references
    /// before the row itself.
    pub fn delete_tag(&self, id: TagId) -> Result<Tag> {
        let tag = self.store.write(|tx| delete_tag_in(tx, id))?;
        self.cache.evict_tag(id);
        info!(id = %tag.id, name = %tag.name, "deleted tag");
        Ok(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

fn neighbours(conn: &Connection, id: TagId, direction: Direction) -> Result<BTreeSet<TagId>> {
    match direction {
        Direction::Up => conn.parent_ids(id),
        Direction::Down => conn.child_ids(id),
    }
}

fn closure_in(conn: &Connection, start: TagId, direction: Direction) -> Result<BTreeSet<TagId>> {
    let mut visited = BTreeSet::new();
    let mut worklist = vec![start];

    while let Some(current) = worklist.pop() {
        for next in neighbours(conn, current, direction)? {
            if next != start && visited.insert(next) {
                worklist.push(next);
            }
        }
    }

    Ok(visited)
}

/// Checked insertion shared by every caller that adds edges inside a larger
/// transaction. Leaves the store untouched on error.
pub(crate) fn add_edge_in(
    conn: &Connection,
    parent: TagId,
    child: TagId,
    relationship_type: RelationshipType,
) -> Result<bool> {
    if parent == child {
        return Err(TaxonError::SelfReference(parent));
    }
    conn.require_tag(parent)?;
    conn.require_tag(child)?;

    if conn.get_edge(parent, child)?.is_some() {
        return Ok(false);
    }
    if let Some(path) = cycle_path_in(conn, parent, child)? {
        return Err(TaxonError::Cycle { path });
    }

    conn.insert_edge(&HierarchyEdge {
        parent_id: parent,
        child_id: child,
        relationship_type,
        created_at: Utc::now(),
    })
}

/// Breadth-first search downward from `child`; if `parent` is reachable the
/// new edge would close the loop `child -> .. -> parent -> child`.
pub(crate) fn cycle_path_in(
    conn: &Connection,
    parent: TagId,
    child: TagId,
) -> Result<Option<Vec<TagId>>> {
    if parent == child {
        return Ok(Some(vec![parent, child]));
    }

    let mut came_from: HashMap<TagId, TagId> = HashMap::new();
    let mut visited = HashSet::from([child]);
    let mut queue = VecDeque::from([child]);

    while let Some(current) = queue.pop_front() {
        for next in conn.child_ids(current)? {
            if !visited.insert(next) {
                continue;
            }
            came_from.insert(next, current);
            if next == parent {
                let mut path = vec![parent];
                let mut step = parent;
                while let Some(&previous) = came_from.get(&step) {
                    path.push(previous);
                    step = previous;
                }
                path.reverse();
                path.push(child);
                return Ok(Some(path));
            }
            queue.push_back(next);
        }
    }

    Ok(None)
}

pub(crate) fn delete_tag_in(conn: &Connection, id: TagId) -> Result<Tag> {
    let tag = conn.require_tag(id)?;
    let children = conn.child_ids(id)?;
    if !children.is_empty() {
        return Err(TaxonError::HasChildren {
            id,
            children: children.len(),
        });
    }

    conn.delete_edges_touching(id)?;
    conn.delete_content_tags_for(id)?;
    conn.clear_approved_tag(id)?;
    conn.delete_tag_row(id)?;
    Ok(tag)
}

//! Tag registry use cases
//!
//! Name resolution, fuzzy matching, merging and duplicate sweeps. All creation
//! goes through the store's insert-or-get on `name_key`, which is what keeps
//! one tag per case-folded name under concurrent callers.

use crate::application::cache::NameCache;
use crate::application::hierarchy::{add_edge_in, cycle_path_in};
use crate::domain::normalizer::{
    duplicate_key, infer_tag_type, name_key, normalize, validate_name,
};
use crate::domain::similarity::similarity_ratio;
use crate::domain::{HierarchyEdge, NewTag, RelationshipType, Tag, TagId, TagType};
use crate::error::{format_path, Result, TaxonError};
use crate::infrastructure::{ContentIndex, EdgeRows, NormalizationRows, SqliteStore, TagRows};
use rusqlite::Connection;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attributes used only when a lookup ends up creating the tag
#[derive(Debug, Clone, Default)]
pub struct NewTagOptions {
    /// Inferred from the name when unset
    pub tag_type: Option<TagType>,
    pub description: Option<String>,
    pub is_featured: bool,
    pub is_private: bool,
    /// Parents linked to a freshly created tag
    pub parents: Vec<TagId>,
    pub relationship_type: RelationshipType,
}

/// Outcome of a resolve call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub tag: Tag,
    pub created: bool,
    /// Set when the tag was found by similarity instead of by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    /// Surviving tag after the merge
    pub tag: Tag,
    pub merged_id: TagId,
    pub merged_name: String,
    pub edges_repointed: usize,
    /// Edges not carried over: self-loops, duplicates and would-be cycles
    pub edges_dropped: usize,
    pub content_moved: usize,
    pub normalizations_redirected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepGroup {
    pub key: String,
    pub primary: TagId,
    pub primary_name: String,
    pub merged: Vec<TagId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepFailure {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Duplicate sets found
    pub sets: usize,
    /// Tags merged away
    pub merged: usize,
    pub groups: Vec<SweepGroup>,
    pub failures: Vec<SweepFailure>,
}

/// Name-level access to the tag set
#[derive(Debug, Clone)]
pub struct Registry {
    store: Arc<SqliteStore>,
    cache: Arc<NameCache>,
    fuzzy_threshold: f64,
}

impl Registry {
    pub fn new(store: Arc<SqliteStore>, cache: Arc<NameCache>, fuzzy_threshold: f64) -> Self {
        Registry {
            store,
            cache,
            fuzzy_threshold,
        }
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    /// Look up `raw` by its normalized, case-folded name. Never creates.
    pub fn find(&self, raw: &str) -> Result<Option<Tag>> {
        validate_name(raw)?;
        self.lookup(&name_key(&normalize(raw)))
    }

    /// Look up a tag by id
    pub fn get(&self, id: TagId) -> Result<Tag> {
        self.store.read(|conn| conn.require_tag(id))
    }

    pub fn list(&self) -> Result<Vec<Tag>> {
        self.store.read(|conn| conn.list_tags())
    }

    /// Number of content items tagged with `id`
    pub fn content_count(&self, id: TagId) -> Result<usize> {
        self.store.read(|conn| {
            conn.require_tag(id)?;
            conn.content_count_for_tag(id)
        })
    }

    fn lookup(&self, key: &str) -> Result<Option<Tag>> {
        if let Some(id) = self.cache.get(key) {
            match self.store.read(|conn| conn.get_tag(id))? {
                Some(tag) if tag.name_key == key => return Ok(Some(tag)),
                _ => {
                    debug!(key, %id, "dropping stale cache entry");
                    self.cache.remove_key(key);
                }
            }
        }

        let found = self.store.read(|conn| conn.find_tag_by_key(key))?;
        if let Some(tag) = &found {
            self.cache.insert(key, tag.id);
        }
        Ok(found)
    }

    /// Return the tag for `raw`, creating it if no tag has the same
    /// case-folded normalized name
    pub fn resolve_or_create(&self, raw: &str) -> Result<Tag> {
        Ok(self
            .resolve_or_create_with(raw, &NewTagOptions::default())?
            .tag)
    }

    /// Like [`Registry::resolve_or_create`], applying `options` if the tag is
    /// created. Options are ignored for existing tags.
    pub fn resolve_or_create_with(&self, raw: &str, options: &NewTagOptions) -> Result<Resolution> {
        validate_name(raw)?;
        let key = name_key(&normalize(raw));
        if let Some(tag) = self.lookup(&key)? {
            debug!(name = %tag.name, id = %tag.id, "resolved existing tag");
            return Ok(Resolution {
                tag,
                created: false,
                similarity: None,
            });
        }

        let resolution = self
            .store
            .write(|tx| resolve_or_create_in(tx, raw, options))?;
        self.cache.insert(key, resolution.tag.id);
        if resolution.created {
            info!(name = %resolution.tag.name, id = %resolution.tag.id, "created tag");
        } else {
            debug!(name = %resolution.tag.name, "tag created concurrently, reusing");
        }
        Ok(resolution)
    }

    /// Most similar existing tag at or above `threshold`. Ties go to the
    /// lowest id.
    pub fn find_similar(&self, raw: &str, threshold: f64) -> Result<Option<(Tag, f64)>> {
        validate_name(raw)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TaxonError::Validation(format!(
                "Similarity threshold must be between 0 and 1, got {}",
                threshold
            )));
        }

        let candidate = normalize(raw);
        let mut best: Option<(Tag, f64)> = None;
        for tag in self.list()? {
            let score = similarity_ratio(&candidate, &tag.name);
            if score < threshold {
                continue;
            }
            if best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((tag, score));
            }
        }
        Ok(best)
    }

    /// Exact lookup, then similarity match, then creation.
    ///
    /// `threshold` defaults to the configured fuzzy threshold.
    pub fn resolve_or_create_fuzzy(
        &self,
        raw: &str,
        threshold: Option<f64>,
        options: &NewTagOptions,
    ) -> Result<Resolution> {
        if let Some(tag) = self.find(raw)? {
            return Ok(Resolution {
                tag,
                created: false,
                similarity: None,
            });
        }

        let threshold = threshold.unwrap_or(self.fuzzy_threshold);
        if let Some((tag, score)) = self.find_similar(raw, threshold)? {
            info!(input = raw, matched = %tag.name, score, "fuzzy matched tag");
            return Ok(Resolution {
                tag,
                created: false,
                similarity: Some(score),
            });
        }

        self.resolve_or_create_with(raw, options)
    }

    /// Fold `loser` into `winner` and delete `loser`.
    ///
    /// Edges are re-pointed at the winner unless they would become a
    /// self-loop, a duplicate or a cycle. Content associations and approved
    /// normalizations follow. The winner keeps its own description, or takes
    /// the loser's when it has none.
    pub fn merge(&self, loser: TagId, winner: TagId) -> Result<MergeReport> {
        let report = self.store.write(|tx| merge_in(tx, loser, winner))?;
        self.cache.evict_tag(loser);
        self.cache.insert(report.tag.name_key.clone(), report.tag.id);
        info!(
            merged = %report.merged_name,
            into = %report.tag.name,
            edges_repointed = report.edges_repointed,
            edges_dropped = report.edges_dropped,
            content_moved = report.content_moved,
            "merged tags"
        );
        Ok(report)
    }

    /// Find tags that share a canonical form once case and word separators
    /// are ignored, and merge each set into one primary.
    ///
    /// Each set is merged in its own transaction; a failing set is reported
    /// and the sweep moves on.
    pub fn sweep_duplicates(&self) -> Result<SweepReport> {
        let mut groups: BTreeMap<String, Vec<TagId>> = BTreeMap::new();
        for tag in self.list()? {
            groups.entry(duplicate_key(&tag.name)).or_default().push(tag.id);
        }

        let mut report = SweepReport::default();
        for (key, ids) in groups.into_iter().filter(|(_, ids)| ids.len() > 1) {
            report.sets += 1;
            match self.store.write(|tx| merge_group_in(tx, &ids)) {
                Ok(Some(group)) => {
                    for id in &group.merged {
                        self.cache.evict_tag(*id);
                    }
                    info!(
                        key = %key,
                        primary = %group.primary_name,
                        merged = group.merged.len(),
                        "merged duplicate set"
                    );
                    report.merged += group.merged.len();
                    report.groups.push(SweepGroup { key, ..group });
                }
                Ok(None) => debug!(key = %key, "duplicate set vanished before merge"),
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to merge duplicate set");
                    report.failures.push(SweepFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Insert-or-get inside an existing transaction, linking any requested
/// parents to a newly created tag
pub(crate) fn resolve_or_create_in(
    conn: &Connection,
    raw: &str,
    options: &NewTagOptions,
) -> Result<Resolution> {
    validate_name(raw)?;
    let name = normalize(raw);
    let new_tag = NewTag {
        name_key: name_key(&name),
        tag_type: options.tag_type.unwrap_or_else(|| infer_tag_type(&name)),
        description: options.description.clone(),
        is_featured: options.is_featured,
        is_private: options.is_private,
        name,
    };

    let (tag, created) = conn.insert_tag_or_get(&new_tag)?;
    if created {
        for parent in &options.parents {
            add_edge_in(conn, *parent, tag.id, options.relationship_type)?;
        }
    }

    Ok(Resolution {
        tag,
        created,
        similarity: None,
    })
}

/// Re-add `original` as `parent -> child` if that is still a legal new edge
fn repoint_edge(
    conn: &Connection,
    parent: TagId,
    child: TagId,
    original: &HierarchyEdge,
) -> Result<bool> {
    if parent == child || conn.get_edge(parent, child)?.is_some() {
        return Ok(false);
    }
    if let Some(path) = cycle_path_in(conn, parent, child)? {
        warn!(
            %parent,
            %child,
            path = %format_path(&path),
            "skipping re-pointed edge that would create a cycle"
        );
        return Ok(false);
    }
    conn.insert_edge(&HierarchyEdge {
        parent_id: parent,
        child_id: child,
        ..original.clone()
    })
}

pub(crate) fn merge_in(conn: &Connection, loser: TagId, winner: TagId) -> Result<MergeReport> {
    if loser == winner {
        return Err(TaxonError::Validation(format!(
            "Cannot merge tag {} into itself",
            loser
        )));
    }
    let loser_tag = conn.require_tag(loser)?;
    let winner_tag = conn.require_tag(winner)?;

    let outgoing = conn.edges_from(loser)?;
    let incoming = conn.edges_to(loser)?;
    conn.delete_edges_touching(loser)?;

    let mut edges_repointed = 0;
    let mut edges_dropped = 0;
    let repointed = outgoing
        .iter()
        .map(|edge| (winner, edge.child_id, edge))
        .chain(incoming.iter().map(|edge| (edge.parent_id, winner, edge)));
    for (parent, child, edge) in repointed {
        if repoint_edge(conn, parent, child, edge)? {
            edges_repointed += 1;
        } else {
            edges_dropped += 1;
        }
    }

    let content_moved = conn.transfer_content_tags(loser, winner)?;
    let normalizations_redirected = conn.redirect_approved_tag(loser, winner)?;

    if winner_tag.description.is_none() && loser_tag.description.is_some() {
        conn.set_tag_description(winner, loser_tag.description.as_deref())?;
    }

    conn.delete_tag_row(loser)?;

    Ok(MergeReport {
        tag: conn.require_tag(winner)?,
        merged_id: loser,
        merged_name: loser_tag.name,
        edges_repointed,
        edges_dropped,
        content_moved,
        normalizations_redirected,
    })
}

/// Merge one duplicate set into its primary.
///
/// Members are re-read inside the transaction; returns `None` when fewer than
/// two are left.
fn merge_group_in(conn: &Connection, ids: &[TagId]) -> Result<Option<SweepGroup>> {
    let mut members = Vec::new();
    for id in ids {
        if let Some(tag) = conn.get_tag(*id)? {
            let has_parents = !conn.parent_ids(tag.id)?.is_empty();
            let content = conn.content_count_for_tag(tag.id)?;
            members.push((tag, has_parents, content));
        }
    }
    if members.len() < 2 {
        return Ok(None);
    }

    // has parents, then already canonical, then most content, then has a
    // description, then oldest, then lowest id
    members.sort_by_key(|(tag, has_parents, content)| {
        (
            Reverse(*has_parents),
            Reverse(tag.name == normalize(&tag.name)),
            Reverse(*content),
            Reverse(tag.description.is_some()),
            tag.created_at,
            tag.id,
        )
    });

    let primary = members[0].0.clone();
    let mut merged = Vec::new();
    for (tag, _, _) in members.into_iter().skip(1) {
        merge_in(conn, tag.id, primary.id)?;
        merged.push(tag.id);
    }

    Ok(Some(SweepGroup {
        key: String::new(),
        primary: primary.id,
        primary_name: primary.name,
        merged,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::hierarchy::HierarchyGraph;
    use tracing_test::traced_test;

    fn registry() -> (Registry, HierarchyGraph, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let cache = Arc::new(NameCache::new());
        (
            Registry::new(store.clone(), cache.clone(), 0.9),
            HierarchyGraph::new(store.clone(), cache),
            store,
        )
    }

    /// Insert a tag with the exact stored name, bypassing normalization
    fn raw_tag(store: &SqliteStore, name: &str) -> Tag {
        let new_tag = NewTag {
            name: name.to_string(),
            name_key: name.to_lowercase(),
            ..Default::default()
        };
        store.write(|tx| tx.insert_tag_or_get(&new_tag)).unwrap().0
    }

    #[test]
    fn test_resolve_normalizes_and_reuses() {
        let (registry, _, _) = registry();
        let first = registry.resolve_or_create("  javascript ").unwrap();
        assert_eq!(first.name, "JavaScript");
        assert_eq!(first.tag_type, TagType::Language);

        let second = registry.resolve_or_create("JAVASCRIPT").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_rejects_invalid_names() {
        let (registry, _, _) = registry();
        assert!(matches!(
            registry.resolve_or_create("   "),
            Err(TaxonError::Validation(_))
        ));
        assert!(matches!(
            registry.resolve_or_create(&"x".repeat(101)),
            Err(TaxonError::Validation(_))
        ));
    }

    #[test]
    fn test_find_never_creates() {
        let (registry, _, _) = registry();
        assert!(registry.find("Rust").unwrap().is_none());
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_stale_cache_entry_is_revalidated() {
        let (registry, graph, _) = registry();
        let tag = registry.resolve_or_create("Kotlin").unwrap();
        // delete behind the registry's back, as another process would
        registry.store.write(|tx| tx.delete_tag_row(tag.id)).unwrap();

        assert!(registry.find("kotlin").unwrap().is_none());
        let recreated = registry.resolve_or_create("kotlin").unwrap();
        assert_ne!(recreated.id, tag.id);
        assert!(graph.get_parents(recreated.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_with_options_links_parents() {
        let (registry, graph, _) = registry();
        let web = registry.resolve_or_create("Web Development").unwrap();
        let options = NewTagOptions {
            tag_type: Some(TagType::Framework),
            description: Some("UI library".to_string()),
            parents: vec![web.id],
            ..Default::default()
        };

        let resolution = registry.resolve_or_create_with("react", &options).unwrap();
        assert!(resolution.created);
        assert_eq!(resolution.tag.tag_type, TagType::Framework);
        assert_eq!(resolution.tag.description.as_deref(), Some("UI library"));
        assert!(graph.get_parents(resolution.tag.id).unwrap().contains(&web.id));

        let again = registry.resolve_or_create_with("React", &options).unwrap();
        assert!(!again.created);
    }

    #[test]
    fn test_create_with_missing_parent_rolls_back() {
        let (registry, _, _) = registry();
        let options = NewTagOptions {
            parents: vec![TagId(999)],
            ..Default::default()
        };
        assert!(matches!(
            registry.resolve_or_create_with("orphan", &options),
            Err(TaxonError::NotFound { .. })
        ));
        assert!(registry.find("orphan").unwrap().is_none());
    }

    #[test]
    fn test_find_similar_and_fuzzy_resolution() {
        let (registry, _, _) = registry();
        let js = registry.resolve_or_create("JavaScript").unwrap();

        let (found, score) = registry.find_similar("javascrpt", 0.9).unwrap().unwrap();
        assert_eq!(found.id, js.id);
        assert!(score >= 0.9);

        let resolution = registry
            .resolve_or_create_fuzzy("javascrpt", None, &NewTagOptions::default())
            .unwrap();
        assert_eq!(resolution.tag.id, js.id);
        assert!(!resolution.created);
        assert!(resolution.similarity.is_some());

        let unrelated = registry
            .resolve_or_create_fuzzy("Haskell", None, &NewTagOptions::default())
            .unwrap();
        assert!(unrelated.created);
    }

    #[test]
    fn test_find_similar_rejects_bad_threshold() {
        let (registry, _, _) = registry();
        assert!(matches!(
            registry.find_similar("x", 1.5),
            Err(TaxonError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_repoints_edges_and_content() {
        let (registry, graph, store) = registry();
        let programming = registry.resolve_or_create("Programming").unwrap();
        let loser = raw_tag(&store, "js");
        let winner = registry.resolve_or_create("JavaScript").unwrap();
        let react = registry.resolve_or_create("React").unwrap();

        graph
            .add_edge(programming.id, loser.id, RelationshipType::ParentChild)
            .unwrap();
        graph
            .add_edge(loser.id, react.id, RelationshipType::ParentChild)
            .unwrap();
        let item = store
            .write(|tx| {
                let item = tx.insert_content("Closures", None, None)?;
                tx.tag_content(item.id, loser.id)?;
                tx.set_tag_description(loser.id, Some("scripting"))?;
                Ok(item)
            })
            .unwrap();

        let report = registry.merge(loser.id, winner.id).unwrap();
        assert_eq!(report.edges_repointed, 2);
        assert_eq!(report.content_moved, 1);
        assert_eq!(report.tag.description.as_deref(), Some("scripting"));

        assert!(graph.get_parents(winner.id).unwrap().contains(&programming.id));
        assert!(graph.get_children(winner.id).unwrap().contains(&react.id));
        assert!(store
            .read(|c| c.content_tag_ids(item.id))
            .unwrap()
            .contains(&winner.id));
        assert!(matches!(
            registry.get(loser.id),
            Err(TaxonError::NotFound { .. })
        ));
        assert_eq!(registry.find("js").unwrap(), None);
    }

    #[test]
    fn test_merge_drops_edge_that_would_cycle() {
        let (registry, graph, _) = registry();
        let a = registry.resolve_or_create("Alpha").unwrap();
        let b = registry.resolve_or_create("Beta").unwrap();
        let c = registry.resolve_or_create("Gamma").unwrap();
        // a -> b -> c, and c is merged into a: c's parent b would become a's
        // parent, closing a -> b -> a
        graph.add_edge(a.id, b.id, RelationshipType::ParentChild).unwrap();
        graph.add_edge(b.id, c.id, RelationshipType::ParentChild).unwrap();

        let report = registry.merge(c.id, a.id).unwrap();
        assert_eq!(report.edges_repointed, 0);
        assert_eq!(report.edges_dropped, 1);
        assert!(graph.get_parents(a.id).unwrap().is_empty());
        assert_eq!(graph.get_children(a.id).unwrap().len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_dropped_cycle_edge_is_logged() {
        let (registry, graph, _) = registry();
        let a = registry.resolve_or_create("Alpha").unwrap();
        let b = registry.resolve_or_create("Beta").unwrap();
        let c = registry.resolve_or_create("Gamma").unwrap();
        graph.add_edge(a.id, b.id, RelationshipType::ParentChild).unwrap();
        graph.add_edge(b.id, c.id, RelationshipType::ParentChild).unwrap();

        registry.merge(c.id, a.id).unwrap();
        assert!(logs_contain("skipping re-pointed edge that would create a cycle"));
    }

    #[test]
    fn test_merge_into_self_is_rejected() {
        let (registry, _, _) = registry();
        let tag = registry.resolve_or_create("Rust").unwrap();
        assert!(matches!(
            registry.merge(tag.id, tag.id),
            Err(TaxonError::Validation(_))
        ));
    }

    #[test]
    fn test_sweep_prefers_tag_with_parents_and_is_idempotent() {
        let (registry, graph, store) = registry();
        let languages = registry.resolve_or_create("Languages").unwrap();
        raw_tag(&store, "Java Script");
        let dotted = raw_tag(&store, "java-script");
        registry.resolve_or_create("JavaScript").unwrap();
        graph
            .add_edge(languages.id, dotted.id, RelationshipType::ParentChild)
            .unwrap();

        let report = registry.sweep_duplicates().unwrap();
        assert_eq!(report.sets, 1);
        assert_eq!(report.merged, 2);
        assert_eq!(report.groups[0].primary, dotted.id);
        assert!(report.failures.is_empty());

        let names: Vec<String> = registry.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Languages", "java-script"]);

        let again = registry.sweep_duplicates().unwrap();
        assert_eq!(again.sets, 0);
        assert_eq!(again.merged, 0);
    }

    #[test]
    fn test_sweep_prefers_canonical_name_without_parents() {
        let (registry, _, store) = registry();
        raw_tag(&store, "node js");
        let canonical = registry.resolve_or_create("Node.js").unwrap();

        let report = registry.sweep_duplicates().unwrap();
        assert_eq!(report.groups[0].primary, canonical.id);
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_sweep_keeps_names_that_differ_by_symbols() {
        let (registry, _, store) = registry();
        for name in ["C", "C++", "C#", "F", "F#", "net", ".NET"] {
            registry.resolve_or_create(name).unwrap();
        }
        raw_tag(&store, "c-sharp");

        let report = registry.sweep_duplicates().unwrap();
        assert_eq!(report.sets, 0);
        assert_eq!(report.merged, 0);
        assert_eq!(registry.list().unwrap().len(), 8);
    }
}

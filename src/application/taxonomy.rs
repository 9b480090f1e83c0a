//! Wiring of the store, name cache and services for one workspace

use crate::application::cache::NameCache;
use crate::application::hierarchy::HierarchyGraph;
use crate::application::registry::Registry;
use crate::application::review::ReviewWorkflow;
use crate::domain::{ContentId, ContentItem, TagId};
use crate::error::{Result, TaxonError};
use crate::infrastructure::{Config, ContentIndex, SqliteStore, TagRows, Workspace};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Entry point for library users: every service shares one store and one
/// name cache.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    store: Arc<SqliteStore>,
    cache: Arc<NameCache>,
    config: Config,
}

impl Taxonomy {
    pub fn new(store: SqliteStore, config: Config) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Build on a store that other handles may also use
    pub fn with_shared_store(store: Arc<SqliteStore>, config: Config) -> Self {
        Taxonomy {
            store,
            cache: Arc::new(NameCache::new()),
            config,
        }
    }

    /// Open the workspace's configured database
    pub fn open(workspace: &Workspace) -> Result<Self> {
        let config = workspace.load_config()?;
        let store = workspace.open_store(&config)?;
        debug!(root = %workspace.root().display(), "opened taxonomy");
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    pub fn hierarchy(&self) -> HierarchyGraph {
        HierarchyGraph::new(self.store.clone(), self.cache.clone())
    }

    pub fn registry(&self) -> Registry {
        Registry::new(
            self.store.clone(),
            self.cache.clone(),
            self.config.registry.fuzzy_threshold,
        )
    }

    pub fn review(&self) -> ReviewWorkflow {
        ReviewWorkflow::new(
            self.store.clone(),
            self.cache.clone(),
            self.registry(),
            self.config.review.clone(),
        )
    }

    /// Register a content item so it can be tagged and searched
    pub fn add_content(
        &self,
        title: &str,
        description: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<ContentItem> {
        self.store
            .write(|tx| tx.insert_content(title, description, metadata))
    }

    /// Attach a tag to a content item; false if it was already attached
    pub fn tag_content(&self, content: ContentId, tag: TagId) -> Result<bool> {
        self.store.write(|tx| {
            if tx.get_content(content)?.is_none() {
                return Err(TaxonError::NotFound {
                    entity: "Content",
                    id: content.to_string(),
                });
            }
            tx.require_tag(tag)?;
            tx.tag_content(content, tag)
        })
    }

    pub fn content_tags(&self, content: ContentId) -> Result<BTreeSet<TagId>> {
        self.store.read(|conn| conn.content_tag_ids(content))
    }
}

//! In-process name cache
//!
//! Maps case-folded names to tag ids. Entries are hints only: every hit is
//! re-validated against the store, so a stale entry left behind by another
//! process costs one extra lookup and nothing more.

use crate::domain::TagId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct NameCache {
    entries: RwLock<HashMap<String, TagId>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, TagId>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, TagId>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<TagId> {
        self.read().get(key).copied()
    }

    pub fn insert(&self, key: impl Into<String>, id: TagId) {
        self.write().insert(key.into(), id);
    }

    pub fn remove_key(&self, key: &str) {
        self.write().remove(key);
    }

    /// Drop every key that points at `id`
    pub fn evict_tag(&self, id: TagId) {
        self.write().retain(|_, cached| *cached != id);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

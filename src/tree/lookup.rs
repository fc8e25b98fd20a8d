//! Tree lookup service
//!
//! Answers "is this move a known child of the cursor" without blocking the
//! caller. [`BookLookup`] reads the shared in-memory store; [`CachedLookup`]
//! decorates any other lookup (a remote book, a database) with a hit cache.
//!
//! Lookups are pure reads. A miss is `Ok(None)`; `Err` is reserved for tree
//! data that cannot be interpreted.

use super::{MoveNode, NodeKey, SharedStore};
use crate::core::TrainerResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Async resolution of a candidate move against a parent node
#[async_trait]
pub trait TreeLookup: Send + Sync {
    /// Return the book child of `parent` whose move equals `label`
    async fn lookup_child(&self, label: &str, parent: &MoveNode) -> TrainerResult<Option<MoveNode>>;
}

#[async_trait]
impl<T: TreeLookup + ?Sized> TreeLookup for Arc<T> {
    async fn lookup_child(&self, label: &str, parent: &MoveNode) -> TrainerResult<Option<MoveNode>> {
        (**self).lookup_child(label, parent).await
    }
}

/// Lookup over the shared [`MoveStore`](super::MoveStore)
///
/// Provisional nodes are never reported as known: they exist in the arena so
/// that recording stays idempotent, but they are not part of the book.
#[derive(Clone)]
pub struct BookLookup {
    store: SharedStore,
}

impl BookLookup {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TreeLookup for BookLookup {
    async fn lookup_child(&self, label: &str, parent: &MoveNode) -> TrainerResult<Option<MoveNode>> {
        let store = self.store.read();
        let child = store.child_by_label(parent.key, label)?;
        Ok(child.filter(|node| !node.is_provisional()).cloned())
    }
}

/// Caches hits of an inner lookup by `(parent, label)`
///
/// Misses go to the inner lookup every time since the book may grow.
pub struct CachedLookup<L> {
    inner: L,
    hits: Mutex<HashMap<(NodeKey, String), MoveNode>>,
}

impl<L: TreeLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.hits.lock().len()
    }

    /// Forget every cached hit, e.g. after a book reload
    pub fn invalidate(&self) {
        self.hits.lock().clear();
    }
}

#[async_trait]
impl<L: TreeLookup> TreeLookup for CachedLookup<L> {
    async fn lookup_child(&self, label: &str, parent: &MoveNode) -> TrainerResult<Option<MoveNode>> {
        let cache_key = (parent.key, label.to_string());
        let cached = self.hits.lock().get(&cache_key).cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let found = self.inner.lookup_child(label, parent).await?;
        if let Some(node) = &found {
            self.hits.lock().insert(cache_key, node.clone());
        }
        Ok(found)
    }
}

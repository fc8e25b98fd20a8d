//! Arena store for the opening tree
//!
//! Nodes live in a `Vec` indexed by [`NodeKey`]; slot 0 is always the empty
//! root. Children are lists of keys, so appending a node never moves or
//! copies existing subtrees.

use super::{MoveNode, MoveRef, NodeKey, PieceTag};
use crate::core::{TrainerError, TrainerResult};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Store shared between the lookup service and the move recorder
pub type SharedStore = Arc<RwLock<MoveStore>>;

/// Flat table of opening tree nodes
#[derive(Debug, Clone)]
pub struct MoveStore {
    nodes: Vec<MoveNode>,
}

impl Default for MoveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveStore {
    /// Create a store holding only the empty root
    pub fn new() -> Self {
        Self {
            nodes: vec![MoveNode::empty_root()],
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> &MoveNode {
        &self.nodes[NodeKey::ROOT.index()]
    }

    pub fn get(&self, key: NodeKey) -> Option<&MoveNode> {
        self.nodes.get(key.index())
    }

    /// Every node in arena order, root first
    pub fn iter(&self) -> impl Iterator<Item = &MoveNode> {
        self.nodes.iter()
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the store holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Find the child of `parent` labelled `san`
    ///
    /// # Errors
    ///
    /// [`TrainerError::MalformedTree`] when `parent` is not in the store or the
    /// matching child reference points past the arena.
    pub fn child_by_label(&self, parent: NodeKey, san: &str) -> TrainerResult<Option<&MoveNode>> {
        let parent_node = self
            .get(parent)
            .ok_or_else(|| TrainerError::malformed(format!("unknown parent {}", parent)))?;

        match parent_node.child(san) {
            Some(child) => self.get(child.key).map(Some).ok_or_else(|| {
                TrainerError::malformed(format!(
                    "child {} '{}' of {} is dangling",
                    child.key, san, parent
                ))
            }),
            None => Ok(None),
        }
    }

    /// Append a child under `parent`, keeping sibling labels unique
    ///
    /// If a sibling with the same label already exists its key is returned
    /// instead. A provisional sibling appended again with a non-empty `id` is
    /// confirmed in place (see [`MoveStore::replace_id`]).
    pub fn append_child(
        &mut self,
        parent: NodeKey,
        id: impl Into<String>,
        san: impl Into<String>,
        piece: PieceTag,
    ) -> TrainerResult<NodeKey> {
        let id = id.into();
        let san = san.into();

        let parent_node = self
            .get(parent)
            .ok_or_else(|| TrainerError::malformed(format!("unknown parent {}", parent)))?;

        if let Some(existing) = parent_node.child(&san) {
            let key = existing.key;
            if existing.is_provisional() && !id.is_empty() {
                self.replace_id(parent, key, id)?;
            }
            return Ok(key);
        }

        let key = NodeKey(self.nodes.len());
        self.nodes.push(MoveNode {
            key,
            id: id.clone(),
            san: san.clone(),
            piece: piece.clone(),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(MoveRef {
            key,
            id,
            san,
            piece,
        });

        debug!("[STORE] Appended {} under {}", key, parent);
        Ok(key)
    }

    /// Replace the persisted id of `key`, a child of `parent`
    ///
    /// Used to confirm a provisional node once the book knows it.
    pub fn replace_id(
        &mut self,
        parent: NodeKey,
        key: NodeKey,
        id: impl Into<String>,
    ) -> TrainerResult<()> {
        let id = id.into();
        let node = self
            .nodes
            .get_mut(key.index())
            .ok_or_else(|| TrainerError::malformed(format!("unknown node {}", key)))?;
        node.id = id.clone();

        let parent_node = self
            .nodes
            .get_mut(parent.index())
            .ok_or_else(|| TrainerError::malformed(format!("unknown parent {}", parent)))?;
        let child = parent_node
            .children
            .iter_mut()
            .find(|child| child.key == key)
            .ok_or_else(|| {
                TrainerError::malformed(format!("{} is not a child of {}", key, parent))
            })?;
        child.id = id;
        Ok(())
    }

    /// Labels of the moves leading from the root to `key`
    pub fn path_to(&self, key: NodeKey) -> Option<Vec<String>> {
        fn walk(store: &MoveStore, at: NodeKey, target: NodeKey, path: &mut Vec<String>) -> bool {
            if at == target {
                return true;
            }
            let Some(node) = store.get(at) else {
                return false;
            };
            for child in &node.children {
                path.push(child.san.clone());
                if walk(store, child.key, target, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(self, NodeKey::ROOT, key, &mut path).then_some(path)
    }

    /// Check sibling uniqueness and that every child reference resolves
    pub fn validate(&self) -> TrainerResult<()> {
        for node in &self.nodes {
            let mut seen = HashSet::new();
            for child in &node.children {
                if !seen.insert(child.san.as_str()) {
                    return Err(TrainerError::malformed(format!(
                        "duplicate sibling '{}' under {}",
                        child.san, node.key
                    )));
                }
                match self.get(child.key) {
                    Some(target) if target.san == child.san => {}
                    Some(_) => {
                        return Err(TrainerError::malformed(format!(
                            "child {} of {} does not match its label '{}'",
                            child.key, node.key, child.san
                        )))
                    }
                    None => {
                        return Err(TrainerError::malformed(format!(
                            "child {} of {} is dangling",
                            child.key, node.key
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop a child reference without touching the arena slot
    ///
    /// Only exercised by tests that need dangling references.
    #[cfg(test)]
    pub(crate) fn corrupt_child_key(&mut self, parent: NodeKey, san: &str, key: NodeKey) {
        if let Some(child) = self.nodes[parent.index()]
            .children
            .iter_mut()
            .find(|child| child.san == san)
        {
            child.key = key;
        }
    }
}

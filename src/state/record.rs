//! Recording played moves into the session
//!
//! A known move moves the cursor onto the existing book node. An unknown move
//! gets a provisional node appended under the parent and the cursor moves
//! there; the caller learns about it through the `None` return, which it uses
//! to skip chained recording.

use super::{Action, SessionStore};
use crate::core::{TrainerError, TrainerResult};
use crate::tree::{MoveNode, PieceTag, SharedStore, TreeLookup};
use std::sync::Arc;
use tracing::debug;

/// Node a played move maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMove {
    pub node: MoveNode,
    /// `false` when `node` is a provisional node appended for this move
    pub known: bool,
}

pub struct MoveRecorder {
    lookup: Arc<dyn TreeLookup>,
    tree: SharedStore,
    store: Arc<SessionStore>,
}

impl MoveRecorder {
    pub fn new(lookup: Arc<dyn TreeLookup>, tree: SharedStore, store: Arc<SessionStore>) -> Self {
        Self {
            lookup,
            tree,
            store,
        }
    }

    /// Record `label` played from `parent`
    ///
    /// Returns the book node when the move is known, `None` when a provisional
    /// node was recorded instead.
    pub async fn record_move(
        &self,
        label: &str,
        piece: &PieceTag,
        parent: &MoveNode,
    ) -> TrainerResult<Option<MoveNode>> {
        let recorded = self.locate_move(label, piece, parent).await?;
        self.store.dispatch(Action::MakeMove(recorded.node.clone()));
        Ok(recorded.known.then_some(recorded.node))
    }

    /// Find or append the node for `label` without moving the cursor
    ///
    /// Callers that may be overtaken by a session reset dispatch the returned
    /// node themselves once they know the session is still theirs.
    pub async fn locate_move(
        &self,
        label: &str,
        piece: &PieceTag,
        parent: &MoveNode,
    ) -> TrainerResult<RecordedMove> {
        if let Some(node) = self.lookup.lookup_child(label, parent).await? {
            return Ok(RecordedMove { node, known: true });
        }

        let provisional = {
            let mut tree = self.tree.write();
            let key = tree.append_child(parent.key, String::new(), label, piece.clone())?;
            tree.get(key)
                .cloned()
                .ok_or_else(|| TrainerError::malformed(format!("appended node {} vanished", key)))?
        };

        debug!(
            "[STORE] Recorded provisional '{}' under {}",
            label, parent.key
        );
        Ok(RecordedMove {
            node: provisional,
            known: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Orientation;
    use crate::state::TrainerMode;
    use crate::tree::{BookLookup, MoveStore, NodeKey};

    fn setup() -> (MoveRecorder, SharedStore, Arc<SessionStore>) {
        let mut book = MoveStore::new();
        let e4 = book
            .append_child(NodeKey::ROOT, "n1", "e4", "wp".parse().unwrap())
            .unwrap();
        book.append_child(e4, "n2", "e5", "bp".parse().unwrap())
            .unwrap();
        let tree = book.into_shared();
        let store = Arc::new(SessionStore::new(Orientation::White, TrainerMode::FreePlay));
        let lookup: Arc<dyn TreeLookup> = Arc::new(BookLookup::new(Arc::clone(&tree)));
        (
            MoveRecorder::new(lookup, Arc::clone(&tree), Arc::clone(&store)),
            tree,
            store,
        )
    }

    #[tokio::test]
    async fn test_record_known_move_moves_cursor() {
        let (recorder, tree, store) = setup();
        let root = store.cursor();

        let found = recorder
            .record_move("e4", &"wp".parse().unwrap(), &root)
            .await
            .unwrap()
            .expect("e4 is in the book");

        assert_eq!(found.id, "n1");
        assert_eq!(store.cursor(), found);
        assert_eq!(tree.read().len(), 3, "known moves add no nodes");
    }

    #[tokio::test]
    async fn test_record_novel_move_appends_provisional() {
        let (recorder, tree, store) = setup();
        let root = store.cursor();

        let result = recorder
            .record_move("d4", &"wp".parse().unwrap(), &root)
            .await
            .unwrap();

        assert!(result.is_none());
        let cursor = store.cursor();
        assert!(cursor.is_provisional());
        assert_eq!(cursor.san, "d4");
        assert_eq!(tree.read().root().children.len(), 2);
    }

    #[tokio::test]
    async fn test_record_novel_move_twice_does_not_duplicate() {
        let (recorder, tree, store) = setup();
        let root = store.cursor();
        let piece: PieceTag = "wn".parse().unwrap();

        recorder.record_move("Nf3", &piece, &root).await.unwrap();
        let first = store.cursor();
        recorder.record_move("Nf3", &piece, &root).await.unwrap();

        assert_eq!(store.cursor().key, first.key);
        assert_eq!(tree.read().root().children.len(), 2);
        assert!(tree.read().validate().is_ok());
    }

    #[tokio::test]
    async fn test_locate_move_leaves_cursor_alone() {
        let (recorder, tree, store) = setup();
        let root = store.cursor();

        let known = recorder
            .locate_move("e4", &"wp".parse().unwrap(), &root)
            .await
            .unwrap();
        let novel = recorder
            .locate_move("c4", &"wp".parse().unwrap(), &root)
            .await
            .unwrap();

        assert!(known.known);
        assert!(!novel.known && novel.node.is_provisional());
        assert!(store.cursor().is_root(), "only record_move dispatches");
        assert!(store.line().is_empty());
        assert_eq!(tree.read().root().children.len(), 2);
    }
}

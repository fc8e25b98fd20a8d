//! Free Play Integration Tests
//!
//! In free play nothing is checked against the book; every move is recorded
//! into the tree and the cursor follows it.

use async_trait::async_trait;
use opening_trainer::board::START_FEN;
use opening_trainer::book::parse_book;
use opening_trainer::tree::{CachedLookup, SharedStore};
use opening_trainer::{
    BoardView, BookLookup, MoveNode, NodeKey, Orientation, SessionContext, SessionController,
    SessionStore, TerminalBoard, TrainerMode, TrainerResult, TreeLookup, TurnDelays, TurnOutcome,
    TurnPhase,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn free_session(book: &str) -> (SessionController, SharedStore) {
    let tree = parse_book(book)
        .expect("Failed to parse test book")
        .into_shared();
    let controller = SessionController::new(SessionContext {
        tree: Arc::clone(&tree),
        lookup: Arc::new(CachedLookup::new(BookLookup::new(Arc::clone(&tree)))),
        store: Arc::new(SessionStore::new(Orientation::White, TrainerMode::FreePlay)),
        view: Arc::new(TerminalBoard) as Arc<dyn BoardView>,
        delays: TurnDelays::default(),
    });
    (controller, tree)
}

fn recorded(san: &str, known: bool) -> TurnOutcome {
    TurnOutcome::Recorded {
        san: san.to_string(),
        known,
    }
}

#[tokio::test(start_paused = true)]
async fn test_book_moves_are_followed() {
    let (controller, tree) = free_session(r#"[["e4", "e5", "Nf3"]]"#);
    let nodes = tree.read().len();

    assert_eq!(controller.drop_piece("e2", "e4").await, recorded("e4", true));
    assert_eq!(controller.drop_piece("e7", "e5").await, recorded("e5", true));

    assert_eq!(controller.store().cursor().san, "e5");
    assert_eq!(controller.phase(), TurnPhase::Idle);
    assert_eq!(tree.read().len(), nodes, "known moves add nothing");
}

#[tokio::test(start_paused = true)]
async fn test_novel_moves_are_recorded_once() {
    let (controller, tree) = free_session(r#"[["e4", "e5"]]"#);

    assert_eq!(controller.drop_piece("d2", "d4").await, recorded("d4", false));
    let first = controller.store().cursor();
    assert!(first.is_provisional());
    assert_eq!(first.piece.as_str(), "wp");

    controller.reset_session();
    assert_eq!(controller.fen(), START_FEN);
    assert_eq!(controller.drop_piece("d2", "d4").await, recorded("d4", false));

    let again = controller.store().cursor();
    assert_eq!(again.key, first.key, "same node on the second visit");

    let tree = tree.read();
    let labels: Vec<&str> = tree
        .root()
        .children
        .iter()
        .map(|child| child.san.as_str())
        .collect();
    assert_eq!(labels, vec!["e4", "d4"]);
    assert!(tree.validate().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_siblings_stay_unique_over_a_long_session() {
    let (controller, tree) = free_session(r#"[["e4", "e5"], ["d4", "d5"]]"#);
    let games: [&[(&str, &str)]; 4] = [
        &[("e2", "e4"), ("e7", "e5"), ("g1", "f3")],
        &[("e2", "e4"), ("c7", "c5")],
        &[("e2", "e4"), ("e7", "e5"), ("g1", "f3"), ("b8", "c6")],
        &[("d2", "d4"), ("c7", "c5")],
    ];

    for game in games.iter().chain(games.iter()) {
        controller.reset_session();
        for (from, to) in game.iter() {
            let outcome = controller.drop_piece(from, to).await;
            assert!(
                matches!(outcome, TurnOutcome::Recorded { .. }),
                "{}{} should be recorded, got {:?}",
                from,
                to,
                outcome
            );
        }
    }

    let tree = tree.read();
    assert!(tree.validate().is_ok());
    for node in tree.iter() {
        let unique: HashSet<&str> = node.children.iter().map(|c| c.san.as_str()).collect();
        assert_eq!(unique.len(), node.children.len(), "duplicate under {}", node.key);
    }
    assert_eq!(tree.len(), 9, "root + 4 book + 4 recorded");
    assert_eq!(
        tree.path_to(controller.store().cursor().key),
        Some(vec!["d4".to_string(), "c5".to_string()])
    );
    assert!(tree.get(NodeKey::ROOT).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_switching_to_learn_resets_the_line() {
    let (controller, _tree) = free_session(r#"[["e4", "e5"]]"#);
    controller.drop_piece("e2", "e4").await;

    controller.set_mode(TrainerMode::Learn);

    assert_eq!(controller.store().mode(), TrainerMode::Learn);
    assert!(controller.store().cursor().is_root());
    assert_eq!(controller.fen(), START_FEN);
    assert!(matches!(
        controller.drop_piece("e2", "e4").await,
        TurnOutcome::Continue { .. }
    ));
}

/// Book lookup that waits on the paused clock before answering
struct SlowLookup {
    inner: BookLookup,
    delay: Duration,
}

#[async_trait]
impl TreeLookup for SlowLookup {
    async fn lookup_child(&self, label: &str, parent: &MoveNode) -> TrainerResult<Option<MoveNode>> {
        tokio::time::sleep(self.delay).await;
        self.inner.lookup_child(label, parent).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_reset_while_recording_wins() {
    let tree = parse_book(r#"[["e4", "e5"]]"#).unwrap().into_shared();
    let controller = SessionController::new(SessionContext {
        tree: Arc::clone(&tree),
        lookup: Arc::new(SlowLookup {
            inner: BookLookup::new(Arc::clone(&tree)),
            delay: Duration::from_millis(50),
        }),
        store: Arc::new(SessionStore::new(Orientation::White, TrainerMode::FreePlay)),
        view: Arc::new(TerminalBoard) as Arc<dyn BoardView>,
        delays: TurnDelays::default(),
    });

    for (from, to, san) in [("e2", "e4", "e4"), ("d2", "d4", "d4")] {
        let turn = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.drop_piece(from, to).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!turn.is_finished(), "reset must land inside the turn");
        controller.reset_session();

        let outcome = turn.await.expect("turn task panicked");
        assert_eq!(outcome, TurnOutcome::Aborted { san: san.to_string() });

        let cursor = controller.store().cursor();
        assert!(cursor.is_root(), "cursor stale after reset: {}", cursor.san);
        assert!(controller.store().line().is_empty());
        assert_eq!(controller.fen(), START_FEN);
        assert!(controller.is_idle());
    }

    // The novel move's node exists but is never the cursor
    assert!(tree.read().validate().is_ok());
    assert_eq!(
        controller.drop_piece("e2", "e4").await,
        recorded("e4", true),
        "session usable after reset"
    );
}

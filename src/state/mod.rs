//! Session state container
//!
//! Holds the cursor, the line played so far, the board orientation and the
//! interaction mode. State only changes through [`SessionStore::dispatch`],
//! which applies one [`Action`] at a time and then notifies every observer
//! synchronously with the committed state.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = SessionStore::new(Orientation::White, TrainerMode::Learn);
//! store.subscribe(|state| println!("cursor: {}", state.cursor.san));
//! store.dispatch(Action::MakeMove(node));
//! ```
//!
//! Observers run while the dispatch lock is held and must not dispatch.

pub mod record;

pub use record::{MoveRecorder, RecordedMove};

use crate::board::Orientation;
use crate::core::{TrainerError, TrainerResult};
use crate::tree::MoveNode;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Interaction mode of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerMode {
    /// Moves are recorded into the tree, no book checking
    #[default]
    FreePlay,
    /// Moves are checked against the book and answered
    Learn,
}

impl FromStr for TrainerMode {
    type Err = TrainerError;

    fn from_str(s: &str) -> TrainerResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "free" | "free_play" | "free-play" | "freeplay" => Ok(TrainerMode::FreePlay),
            "learn" | "learning" => Ok(TrainerMode::Learn),
            _ => Err(TrainerError::UnknownVariant {
                kind: "mode",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TrainerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainerMode::FreePlay => f.write_str("free play"),
            TrainerMode::Learn => f.write_str("learn"),
        }
    }
}

/// Snapshot of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Node reached by the last recorded move, the empty root at start
    pub cursor: MoveNode,
    /// Moves recorded since the session started, oldest first
    pub line: Vec<MoveNode>,
    pub orientation: Orientation,
    pub mode: TrainerMode,
}

impl SessionState {
    pub fn new(orientation: Orientation, mode: TrainerMode) -> Self {
        Self {
            cursor: MoveNode::empty_root(),
            line: Vec::new(),
            orientation,
            mode,
        }
    }
}

/// Discrete mutations of [`SessionState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Advance the cursor to `node`
    MakeMove(MoveNode),
    /// Back to the empty root with no recorded line
    Reset,
    SetOrientation(Orientation),
    SetMode(TrainerMode),
}

fn reduce(state: &mut SessionState, action: Action) {
    match action {
        Action::MakeMove(node) => {
            state.line.push(node.clone());
            state.cursor = node;
        }
        Action::Reset => {
            state.cursor = MoveNode::empty_root();
            state.line.clear();
        }
        Action::SetOrientation(orientation) => state.orientation = orientation,
        Action::SetMode(mode) => state.mode = mode,
    }
}

type Observer = Box<dyn Fn(&SessionState) + Send + Sync>;

/// Explicitly constructed state container for one trainer session
pub struct SessionStore {
    state: RwLock<SessionState>,
    observers: RwLock<Vec<Observer>>,
    dispatch_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(orientation: Orientation, mode: TrainerMode) -> Self {
        Self {
            state: RwLock::new(SessionState::new(orientation, mode)),
            observers: RwLock::new(Vec::new()),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Apply `action`, then notify observers with the committed state
    pub fn dispatch(&self, action: Action) {
        let _serial = self.dispatch_lock.lock();
        debug!("[STORE] Dispatch {:?}", action);

        let committed = {
            let mut state = self.state.write();
            reduce(&mut state, action);
            state.clone()
        };

        for observer in self.observers.read().iter() {
            observer(&committed);
        }
    }

    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.observers.write().push(Box::new(observer));
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn cursor(&self) -> MoveNode {
        self.state.read().cursor.clone()
    }

    pub fn line(&self) -> Vec<MoveNode> {
        self.state.read().line.clone()
    }

    pub fn orientation(&self) -> Orientation {
        self.state.read().orientation
    }

    pub fn mode(&self) -> TrainerMode {
        self.state.read().mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKey, PieceTag};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn node(key: usize, san: &str) -> MoveNode {
        MoveNode {
            key: NodeKey(key),
            id: format!("id-{}", key),
            san: san.to_string(),
            piece: "wp".parse::<PieceTag>().unwrap(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_initial_state() {
        let store = SessionStore::new(Orientation::Black, TrainerMode::Learn);
        assert!(store.cursor().is_root());
        assert!(store.line().is_empty());
        assert_eq!(store.orientation(), Orientation::Black);
        assert_eq!(store.mode(), TrainerMode::Learn);
    }

    #[test]
    fn test_make_move_then_reset() {
        let store = SessionStore::new(Orientation::White, TrainerMode::FreePlay);
        store.dispatch(Action::MakeMove(node(1, "e4")));
        store.dispatch(Action::MakeMove(node(2, "e5")));

        assert_eq!(store.cursor().san, "e5");
        let line: Vec<String> = store.line().into_iter().map(|n| n.san).collect();
        assert_eq!(line, vec!["e4", "e5"]);

        store.dispatch(Action::Reset);
        assert!(store.cursor().is_root());
        assert!(store.line().is_empty());
        assert_eq!(store.orientation(), Orientation::White, "reset keeps orientation");
    }

    #[test]
    fn test_observers_see_committed_state() {
        let store = SessionStore::new(Orientation::White, TrainerMode::FreePlay);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let calls = Arc::clone(&calls);
            let seen = Arc::clone(&seen);
            store.subscribe(move |state| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.lock().push(state.cursor.san.clone());
            });
        }

        store.dispatch(Action::MakeMove(node(1, "d4")));
        store.dispatch(Action::SetMode(TrainerMode::Learn));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock(), vec!["d4".to_string(), "d4".to_string()]);
        assert_eq!(store.mode(), TrainerMode::Learn);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("learn".parse::<TrainerMode>().unwrap(), TrainerMode::Learn);
        assert_eq!("free".parse::<TrainerMode>().unwrap(), TrainerMode::FreePlay);
        assert!("blitz".parse::<TrainerMode>().is_err());
    }
}

//! Opening tree - nodes, the arena store and the lookup service
//!
//! The tree is a flat arena of [`MoveNode`]s addressed by [`NodeKey`].
//! Children are stored as [`MoveRef`]s (arena key plus the child's label) so a
//! node can be cloned into the session state without dragging its subtree.
//!
//! # Module Organization
//!
//! - `store` - [`MoveStore`], the arena with lookup/append/replace
//! - `lookup` - [`TreeLookup`], the async "is this a known child" service
//!
//! # Node Kinds
//!
//! | Kind        | `key`          | `id`      | Created by              |
//! |-------------|----------------|-----------|-------------------------|
//! | Root        | `NodeKey::ROOT`| empty     | [`MoveStore::new`]      |
//! | Book        | any            | non-empty | opening book loading    |
//! | Provisional | any            | empty     | recording a novel move  |

pub mod lookup;
pub mod store;

pub use lookup::{BookLookup, CachedLookup, TreeLookup};
pub use store::{MoveStore, SharedStore};

use crate::core::{TrainerError, TrainerResult};
use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role};
use std::fmt;
use std::str::FromStr;

/// Arena index of a node in a [`MoveStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub(crate) usize);

impl NodeKey {
    /// The synthetic empty root every store starts with
    pub const ROOT: NodeKey = NodeKey(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Side-and-piece tag, colour letter followed by piece letter (`"wp"`, `"bn"`)
///
/// The root node carries the empty tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceTag(String);

impl PieceTag {
    pub fn new(color: Color, role: Role) -> Self {
        let side = match color {
            Color::White => 'w',
            Color::Black => 'b',
        };
        PieceTag(format!("{}{}", side, role.char()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Colour of the tagged piece, `None` for the empty tag
    pub fn color(&self) -> Option<Color> {
        match self.0.as_bytes().first() {
            Some(b'w') => Some(Color::White),
            Some(b'b') => Some(Color::Black),
            _ => None,
        }
    }
}

impl FromStr for PieceTag {
    type Err = TrainerError;

    fn from_str(s: &str) -> TrainerResult<Self> {
        let bytes = s.as_bytes();
        let valid = bytes.len() == 2
            && matches!(bytes[0], b'w' | b'b')
            && matches!(bytes[1], b'p' | b'n' | b'b' | b'r' | b'q' | b'k');
        if valid {
            Ok(PieceTag(s.to_string()))
        } else {
            Err(TrainerError::InvalidPieceTag { tag: s.to_string() })
        }
    }
}

impl fmt::Display for PieceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference from a parent to one of its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRef {
    pub key: NodeKey,
    /// Persisted id of the child, empty when provisional
    pub id: String,
    pub san: String,
    pub piece: PieceTag,
}

impl MoveRef {
    pub fn is_provisional(&self) -> bool {
        self.id.is_empty()
    }
}

/// A node in the opening tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveNode {
    pub key: NodeKey,
    /// Opaque persisted identifier, empty for the root and provisional nodes
    pub id: String,
    /// Move in SAN, including the check suffix
    pub san: String,
    pub piece: PieceTag,
    pub children: Vec<MoveRef>,
}

impl MoveNode {
    /// The synthetic root a session cursor starts on
    pub fn empty_root() -> Self {
        Self {
            key: NodeKey::ROOT,
            id: String::new(),
            san: String::new(),
            piece: PieceTag::default(),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.key == NodeKey::ROOT
    }

    /// Node created for a move the book did not know
    pub fn is_provisional(&self) -> bool {
        self.id.is_empty() && !self.is_root()
    }

    pub fn child(&self, san: &str) -> Option<&MoveRef> {
        self.children.iter().find(|child| child.san == san)
    }

    /// Children that belong to the book, skipping provisional ones
    pub fn book_children(&self) -> impl Iterator<Item = &MoveRef> {
        self.children.iter().filter(|child| !child.is_provisional())
    }

    /// The book's expected continuation, if the line goes on
    pub fn book_reply(&self) -> Option<&MoveRef> {
        self.book_children().next()
    }
}

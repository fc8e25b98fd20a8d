//! Opening book loading
//!
//! Books are JSON, in one of two shapes:
//!
//! ```json
//! [["e4", "e5", "Nf3"], ["e4", "c5"], ["d4", "d5"]]
//! ```
//!
//! or a nested node list, where `id` and `piece` are optional and `childData`
//! is accepted for `children`:
//!
//! ```json
//! [{ "id": "a1", "move": "e4", "piece": "wp", "children": [{ "move": "e5" }] }]
//! ```
//!
//! Every move is replayed from the starting position, so illegal book data
//! is rejected at load time and labels are stored exactly as the board
//! produces them (`Bb5` becomes `Bb5+` when it checks). Nodes without an id
//! get a fresh UUID; book nodes are never provisional.

use crate::board::{normalize_san, Board};
use crate::core::{TrainerError, TrainerResult};
use crate::tree::{MoveStore, NodeKey, PieceTag};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BookFile {
    Lines(Vec<Vec<String>>),
    Tree(Vec<BookNode>),
}

#[derive(Debug, Deserialize)]
struct BookNode {
    #[serde(default)]
    id: String,
    #[serde(rename = "move")]
    san: String,
    #[serde(default)]
    piece: Option<String>,
    #[serde(default, alias = "childData")]
    children: Vec<BookNode>,
}

/// Load a book file into a fresh store
pub fn load_book(path: &Path) -> TrainerResult<MoveStore> {
    let contents = fs::read_to_string(path)?;
    let store = parse_book(&contents)?;
    info!(
        "[BOOK] Loaded {} node(s) from {:?}",
        store.len() - 1,
        path
    );
    Ok(store)
}

/// Parse book JSON into a fresh store
pub fn parse_book(json: &str) -> TrainerResult<MoveStore> {
    let mut store = MoveStore::new();
    merge_book(&mut store, json)?;
    Ok(store)
}

/// Merge book JSON into `store`, returning the number of nodes added
///
/// Moves already present are kept; provisional nodes the book knows are
/// confirmed with the book's id.
pub fn merge_book(store: &mut MoveStore, json: &str) -> TrainerResult<usize> {
    let book: BookFile = serde_json::from_str(json)?;
    let before = store.len();

    match book {
        BookFile::Lines(lines) => {
            for (index, line) in lines.iter().enumerate() {
                merge_line(store, line).map_err(|e| TrainerError::Book {
                    message: format!("line {}: {}", index + 1, e),
                })?;
            }
        }
        BookFile::Tree(nodes) => {
            let board = Board::new();
            for node in &nodes {
                merge_node(store, NodeKey::ROOT, &board, node)?;
            }
        }
    }

    store.validate()?;
    Ok(store.len() - before)
}

fn merge_line(store: &mut MoveStore, line: &[String]) -> TrainerResult<()> {
    let mut board = Board::new();
    let mut parent = NodeKey::ROOT;

    for san in line {
        let played = board.play_san(san)?;
        parent = append_book_move(store, parent, String::new(), played.san, played.piece)?;
    }
    Ok(())
}

fn merge_node(
    store: &mut MoveStore,
    parent: NodeKey,
    board: &Board,
    node: &BookNode,
) -> TrainerResult<()> {
    let mut board = board.clone();
    let label = normalize_san(&board, &node.san)?;
    let played = board.play_san(&label)?;

    if let Some(tag) = &node.piece {
        let tag: PieceTag = tag.parse()?;
        if tag != played.piece {
            return Err(TrainerError::Book {
                message: format!(
                    "'{}' is tagged {} but moves a {}",
                    node.san, tag, played.piece
                ),
            });
        }
    }

    let key = append_book_move(store, parent, node.id.clone(), played.san, played.piece)?;
    for child in &node.children {
        merge_node(store, key, &board, child)?;
    }
    Ok(())
}

fn append_book_move(
    store: &mut MoveStore,
    parent: NodeKey,
    id: String,
    san: String,
    piece: PieceTag,
) -> TrainerResult<NodeKey> {
    // Reuse the id of a book move that is already present
    let existing = store
        .child_by_label(parent, &san)?
        .filter(|node| !node.is_provisional())
        .map(|node| node.key);
    if let Some(key) = existing {
        return Ok(key);
    }

    let id = if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    };
    debug!("[BOOK] {} under {}", san, parent);
    store.append_child(parent, id, san, piece)
}

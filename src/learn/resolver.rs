//! Learning resolver
//!
//! Decides what a player's move means for the current line:
//!
//! | Situation                                  | Outcome      |
//! |--------------------------------------------|--------------|
//! | cursor is a book node with no continuation | `End`        |
//! | move is not a book child of the cursor     | `Incorrect`  |
//! | move matches a book leaf                   | `End`        |
//! | move matches a node with continuations     | `Continue`   |
//!
//! The auto-reply of `Continue` is always the first book child of the matched
//! node, so repeated calls on the same tree agree.

use crate::core::TrainerResult;
use crate::tree::{MoveNode, MoveRef, TreeLookup};
use std::sync::Arc;

/// What the trainer should do with the player's move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnOutcome {
    /// Correct move; the book answers with `auto_reply`
    Continue { matched: MoveNode, auto_reply: MoveRef },
    /// Not a book move; take it back
    Incorrect,
    /// The line is exhausted
    End,
}

pub struct LearningResolver {
    lookup: Arc<dyn TreeLookup>,
}

impl LearningResolver {
    pub fn new(lookup: Arc<dyn TreeLookup>) -> Self {
        Self { lookup }
    }

    /// Classify `label` played from `cursor`
    ///
    /// # Errors
    ///
    /// Propagates lookup errors unchanged; callers treat them as a malformed
    /// resolution, distinct from [`LearnOutcome::Incorrect`].
    pub async fn resolve(&self, label: &str, cursor: &MoveNode) -> TrainerResult<LearnOutcome> {
        // Reached the last book move of the line on the previous turn
        if !cursor.is_root() && cursor.book_reply().is_none() {
            return Ok(LearnOutcome::End);
        }

        let Some(matched) = self.lookup.lookup_child(label, cursor).await? else {
            return Ok(LearnOutcome::Incorrect);
        };

        match matched.book_reply().cloned() {
            Some(auto_reply) => Ok(LearnOutcome::Continue {
                matched,
                auto_reply,
            }),
            None => Ok(LearnOutcome::End),
        }
    }
}

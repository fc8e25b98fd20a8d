//! Error types for the trainer
//!
//! Provides the error taxonomy shared by the opening tree, the rules engine
//! wrapper, book loading and settings persistence.

use thiserror::Error;

/// Errors that can occur while training an opening
#[derive(Error, Debug)]
pub enum TrainerError {
    /// Square name could not be parsed (expects `a1`..`h8`)
    #[error("Invalid square: {square}")]
    InvalidSquare { square: String },

    /// SAN string could not be parsed or is not playable in the position
    #[error("Invalid SAN '{san}': {message}")]
    InvalidSan { san: String, message: String },

    /// Piece tag is not a colour letter followed by a piece letter
    #[error("Invalid piece tag: {tag}")]
    InvalidPieceTag { tag: String },

    /// Opening tree data is inconsistent (dangling child, unknown parent)
    #[error("Malformed opening tree: {message}")]
    MalformedTree { message: String },

    /// Opening book file could not be interpreted
    #[error("Opening book error: {message}")]
    Book { message: String },

    /// Unknown mode or orientation name
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Settings or book file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings or book serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrainerError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        TrainerError::MalformedTree {
            message: message.into(),
        }
    }
}

/// Result type alias for trainer operations
pub type TrainerResult<T> = Result<T, TrainerError>;

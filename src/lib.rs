//! Opening trainer
//!
//! Play against an opening tree: in learning mode every move is checked
//! against the book, correct moves are answered with the book reply, wrong
//! moves are taken back and an exhausted line starts over. In free play moves
//! are only recorded.
//!
//! - [`tree`] - arena opening tree and the async lookup port
//! - [`board`] - rules engine wrapper and board views
//! - [`state`] - session state container and move recording
//! - [`learn`] - learning-mode decision logic
//! - [`session`] - the turn state machine and its delayed effects
//! - [`book`] - opening book files
//! - [`core`] - errors, settings, logging

pub mod board;
pub mod book;
pub mod core;
pub mod learn;
pub mod session;
pub mod state;
pub mod tree;

pub use board::{Board, BoardView, Orientation, TerminalBoard};
pub use core::{TrainerError, TrainerResult, TrainerSettings, TurnDelays};
pub use session::{SessionContext, SessionController, TurnOutcome, TurnPhase};
pub use state::{Action, SessionStore, TrainerMode};
pub use tree::{BookLookup, MoveNode, MoveStore, NodeKey, TreeLookup};

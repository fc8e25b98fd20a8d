//! Board adapter - rules engine wrapper and the board view seam
//!
//! [`Board`] wraps a `shakmaty` position with a ply history so the trainer can
//! take back a wrong move exactly. Illegal drops come back as
//! [`MoveAttempt::Illegal`] rather than an error, which keeps the controller's
//! idle transition total.
//!
//! # Integration
//!
//! The session controller owns one `Board` behind a mutex and re-renders the
//! [`BoardView`] after every mutation.

pub mod view;

pub use view::{render_ascii, BoardView, TerminalBoard};

use crate::core::{TrainerError, TrainerResult};
use crate::tree::PieceTag;
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position, Role, Square};
use std::fmt;
use std::str::FromStr;

/// FEN of the standard starting position
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Side displayed at the bottom of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    White,
    Black,
}

impl Orientation {
    pub fn color(self) -> Color {
        match self {
            Orientation::White => Color::White,
            Orientation::Black => Color::Black,
        }
    }
}

impl FromStr for Orientation {
    type Err = TrainerError;

    fn from_str(s: &str) -> TrainerResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Orientation::White),
            "black" | "b" => Ok(Orientation::Black),
            _ => Err(TrainerError::UnknownVariant {
                kind: "orientation",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::White => f.write_str("white"),
            Orientation::Black => f.write_str("black"),
        }
    }
}

/// A move the rules engine accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    /// SAN with check suffix, the label used against the opening tree
    pub san: String,
    pub piece: PieceTag,
    pub uci: String,
}

/// Result of proposing a move to the rules engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveAttempt {
    Applied(PlayedMove),
    Illegal,
}

/// Parse a square name such as `e4`
pub fn parse_square(name: &str) -> TrainerResult<Square> {
    name.trim()
        .parse::<Square>()
        .map_err(|_| TrainerError::InvalidSquare {
            square: name.to_string(),
        })
}

/// Chess position with single-ply undo history
#[derive(Debug, Clone, Default)]
pub struct Board {
    position: Chess,
    history: Vec<Chess>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Number of plies that can be undone
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// Position string handed to the board view
    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    /// Apply a drag from `from` to `to`
    ///
    /// `promotion` is only used when the plain move is illegal because a pawn
    /// reaches the last rank; the drag UI always proposes a queen.
    pub fn apply_move(&mut self, from: Square, to: Square, promotion: Role) -> MoveAttempt {
        let plain = UciMove::Normal {
            from,
            to,
            promotion: None,
        };
        let m = match plain.to_move(&self.position) {
            Ok(m) => m,
            Err(_) => {
                let promoting = UciMove::Normal {
                    from,
                    to,
                    promotion: Some(promotion),
                };
                match promoting.to_move(&self.position) {
                    Ok(m) => m,
                    Err(_) => return MoveAttempt::Illegal,
                }
            }
        };

        MoveAttempt::Applied(self.commit(m))
    }

    /// Play a move given in SAN, as stored in the opening tree
    pub fn play_san(&mut self, san: &str) -> TrainerResult<PlayedMove> {
        let parsed: SanPlus = san.parse().map_err(|_| TrainerError::InvalidSan {
            san: san.to_string(),
            message: "unparsable".to_string(),
        })?;
        let m = parsed
            .san
            .to_move(&self.position)
            .map_err(|e| TrainerError::InvalidSan {
                san: san.to_string(),
                message: e.to_string(),
            })?;
        Ok(self.commit(m))
    }

    /// Take back the last ply; `false` when nothing was played
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.position = previous;
                true
            }
            None => false,
        }
    }

    /// Back to the standard starting position with an empty history
    pub fn reset(&mut self) {
        self.position = Chess::default();
        self.history.clear();
    }

    fn commit(&mut self, m: Move) -> PlayedMove {
        let piece = PieceTag::new(self.position.turn(), m.role());
        let uci = m.to_uci(CastlingMode::Standard).to_string();

        let mut next = self.position.clone();
        let san = SanPlus::from_move_and_play_unchecked(&mut next, m).to_string();
        self.history.push(std::mem::replace(&mut self.position, next));

        PlayedMove { san, piece, uci }
    }
}

/// SAN of `san` normalised the way [`Board`] labels moves (check suffix added)
pub fn normalize_san(board: &Board, san: &str) -> TrainerResult<String> {
    let parsed: San = san
        .trim_end_matches(['+', '#'])
        .parse()
        .map_err(|_| TrainerError::InvalidSan {
            san: san.to_string(),
            message: "unparsable".to_string(),
        })?;
    let m = parsed
        .to_move(board.position())
        .map_err(|e| TrainerError::InvalidSan {
            san: san.to_string(),
            message: e.to_string(),
        })?;
    let mut scratch = board.position().clone();
    Ok(SanPlus::from_move_and_play_unchecked(&mut scratch, m).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drop_piece(board: &mut Board, from: &str, to: &str) -> MoveAttempt {
        board.apply_move(
            parse_square(from).unwrap(),
            parse_square(to).unwrap(),
            Role::Queen,
        )
    }

    #[test]
    fn test_new_board_is_start_position() {
        let board = Board::new();
        assert_eq!(board.fen(), START_FEN);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn test_apply_legal_move() {
        let mut board = Board::new();
        let attempt = drop_piece(&mut board, "e2", "e4");

        match attempt {
            MoveAttempt::Applied(played) => {
                assert_eq!(played.san, "e4");
                assert_eq!(played.piece.as_str(), "wp");
                assert_eq!(played.uci, "e2e4");
            }
            MoveAttempt::Illegal => panic!("e2e4 should be legal"),
        }
        assert_eq!(board.turn(), Color::Black);
        assert_eq!(board.ply(), 1);
    }

    #[test]
    fn test_illegal_move_leaves_position() {
        let mut board = Board::new();
        let before = board.fen();

        assert_eq!(drop_piece(&mut board, "e2", "e5"), MoveAttempt::Illegal);
        assert_eq!(drop_piece(&mut board, "e7", "e5"), MoveAttempt::Illegal, "not black's turn");
        assert_eq!(board.fen(), before);
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn test_undo_restores_exact_position() {
        let mut board = Board::new();
        drop_piece(&mut board, "e2", "e4");
        let after_e4 = board.fen();
        drop_piece(&mut board, "c7", "c5");

        assert!(board.undo());
        assert_eq!(board.fen(), after_e4);
        assert!(board.undo());
        assert_eq!(board.fen(), START_FEN);
        assert!(!board.undo(), "nothing left to undo");
    }

    #[test]
    fn test_play_san_and_check_suffix() {
        let mut board = Board::new();
        for san in ["e4", "e5", "Nf3", "d6"] {
            board.play_san(san).unwrap();
        }
        let check = board.play_san("Bb5").unwrap();
        assert_eq!(check.san, "Bb5+");
        assert_eq!(check.piece.as_str(), "wb");
    }

    #[test]
    fn test_play_san_rejects_impossible_move() {
        let mut board = Board::new();
        assert!(matches!(
            board.play_san("Nf6"),
            Err(TrainerError::InvalidSan { .. })
        ));
        assert!(board.play_san("zz").is_err());
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn test_castling_by_king_drag() {
        let mut board = Board::new();
        for san in ["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"] {
            board.play_san(san).unwrap();
        }

        match drop_piece(&mut board, "e1", "g1") {
            MoveAttempt::Applied(played) => {
                assert_eq!(played.san, "O-O");
                assert_eq!(played.piece.as_str(), "wk");
            }
            MoveAttempt::Illegal => panic!("castling should be legal"),
        }
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut board = Board::new();
        for san in ["h4", "g5", "hxg5", "Nf6", "g6", "Rg8", "g7", "Rh8"] {
            board.play_san(san).unwrap();
        }

        match drop_piece(&mut board, "g7", "g8") {
            MoveAttempt::Applied(played) => assert!(played.san.starts_with("g8=Q")),
            MoveAttempt::Illegal => panic!("promotion should be legal"),
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut board = Board::new();
        board.play_san("d4").unwrap();
        board.reset();
        assert_eq!(board.fen(), START_FEN);
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn test_normalize_san_adds_suffix() {
        let mut board = Board::new();
        for san in ["e4", "e5", "Nf3", "d6"] {
            board.play_san(san).unwrap();
        }
        assert_eq!(normalize_san(&board, "Bb5").unwrap(), "Bb5+");
        assert_eq!(normalize_san(&board, "Bb5+").unwrap(), "Bb5+");
        assert_eq!(board.ply(), 4, "normalising does not play the move");
    }

    #[test]
    fn test_parse_orientation_and_square() {
        assert_eq!("Black".parse::<Orientation>().unwrap(), Orientation::Black);
        assert!("red".parse::<Orientation>().is_err());
        assert!(parse_square("e9").is_err());
        assert_eq!(parse_square(" a1").unwrap(), Square::A1);
    }
}

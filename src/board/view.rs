//! Board view seam
//!
//! The trainer never draws anything itself; it hands a FEN and an orientation
//! to whatever implements [`BoardView`]. The binary uses [`TerminalBoard`].

use super::Orientation;

/// Receiver of position updates
pub trait BoardView: Send + Sync {
    fn render(&self, position: &str, orientation: Orientation);
}

/// Prints the board as text on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBoard;

impl BoardView for TerminalBoard {
    fn render(&self, position: &str, orientation: Orientation) {
        println!("{}", render_ascii(position, orientation));
    }
}

/// Text diagram of the placement field of `fen`, viewed from `orientation`
pub fn render_ascii(fen: &str, orientation: Orientation) -> String {
    let placement = fen.split_whitespace().next().unwrap_or_default();

    // Ranks come 8..1 in FEN
    let mut ranks: Vec<Vec<char>> = placement
        .split('/')
        .map(|rank| {
            rank.chars()
                .flat_map(|c| match c.to_digit(10) {
                    Some(n) => vec!['.'; n as usize],
                    None => vec![c],
                })
                .collect()
        })
        .collect();
    let mut rank_labels: Vec<char> = ('1'..='8').rev().collect();
    let mut file_labels: Vec<char> = ('a'..='h').collect();

    if orientation == Orientation::Black {
        ranks.reverse();
        for rank in &mut ranks {
            rank.reverse();
        }
        rank_labels.reverse();
        file_labels.reverse();
    }

    let mut out = String::new();
    for (label, rank) in rank_labels.iter().zip(&ranks) {
        out.push(*label);
        for square in rank {
            out.push(' ');
            out.push(*square);
        }
        out.push('\n');
    }
    out.push(' ');
    for file in file_labels {
        out.push(' ');
        out.push(file);
    }
    out
}

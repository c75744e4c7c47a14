//! Check, checkmate and stalemate detection.
//!
//! The searches are exhaustive: every piece of the side in question is tried
//! against all 64 squares and each candidate is tested on a hypothetical
//! board. That is at most 16 x 64 legality checks per call, cheap enough at
//! this board size to need no pruning.

use crate::game::board::{Board, Color, Piece, Position};
use crate::game::rules::is_legal_move;

/// Whether `color`'s king is attacked by any opposing piece.
///
/// A board without a king of `color` is never in check.
pub fn is_in_check(color: Color, board: &Board) -> bool {
    let Some(king) = board.king_position(color) else {
        return false;
    };

    board
        .pieces_of(color.opponent())
        .any(|(from, attacker)| is_legal_move(attacker, from, king, board))
}

/// Legal under the movement rules and does not leave the mover in check.
pub fn is_safe_move(piece: Piece, from: Position, to: Position, board: &Board) -> bool {
    is_legal_move(piece, from, to, board) && !is_in_check(piece.color, &board.with_move(from, to))
}

pub fn is_checkmate(color: Color, board: &Board) -> bool {
    is_in_check(color, board) && !has_safe_move(color, board)
}

pub fn is_stalemate(color: Color, board: &Board) -> bool {
    !is_in_check(color, board) && !has_safe_move(color, board)
}

fn has_safe_move(color: Color, board: &Board) -> bool {
    board.pieces_of(color).any(|(from, piece)| {
        Position::all().any(|to| is_safe_move(piece, from, to, board))
    })
}

/// Destinations the piece on `from` can move to without exposing its own king.
/// Empty when the square is empty.
pub fn safe_destinations(board: &Board, from: Position) -> Vec<Position> {
    match board.occupant_at(from) {
        Some(piece) => Position::all()
            .filter(|to| is_safe_move(piece, from, *to, board))
            .collect(),
        None => Vec::new(),
    }
}

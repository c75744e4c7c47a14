//! Per-piece movement geometry.
//!
//! Legality here is purely geometric plus occupancy: whether the move would
//! leave the mover's king attacked is decided by [`crate::game::detector`].

use crate::game::board::{Board, Color, Piece, PieceKind, Position};

/// Whether `piece` standing on `from` may move to `to` on `board`.
///
/// Total over its inputs: never panics, never mutates. Moves onto a square
/// held by the mover's own color are always rejected.
pub fn is_legal_move(piece: Piece, from: Position, to: Position, board: &Board) -> bool {
    if from == to || board.is_occupied_by(to, piece.color) {
        return false;
    }

    let (file_delta, rank_delta) = from.delta(to);
    match piece.kind {
        PieceKind::Pawn => is_legal_pawn_move(piece.color, from, to, board),
        PieceKind::Knight => {
            let (df, dr) = (file_delta.abs(), rank_delta.abs());
            (df == 1 && dr == 2) || (df == 2 && dr == 1)
        }
        PieceKind::Bishop => is_diagonal(file_delta, rank_delta) && board.is_path_clear(from, to),
        PieceKind::Rook => is_straight(file_delta, rank_delta) && board.is_path_clear(from, to),
        PieceKind::Queen => {
            (is_straight(file_delta, rank_delta) || is_diagonal(file_delta, rank_delta))
                && board.is_path_clear(from, to)
        }
        PieceKind::King => file_delta.abs() <= 1 && rank_delta.abs() <= 1,
    }
}

fn is_straight(file_delta: i8, rank_delta: i8) -> bool {
    file_delta == 0 || rank_delta == 0
}

fn is_diagonal(file_delta: i8, rank_delta: i8) -> bool {
    file_delta.abs() == rank_delta.abs()
}

fn is_legal_pawn_move(color: Color, from: Position, to: Position, board: &Board) -> bool {
    let direction = color.pawn_direction();
    let (file_delta, rank_delta) = from.delta(to);

    if file_delta == 0 {
        if rank_delta == direction {
            return !board.is_occupied(to);
        }
        if rank_delta == 2 * direction && from.rank() == color.pawn_home_rank() {
            let intermediate = from.offset(0, direction);
            return matches!(intermediate, Some(square) if !board.is_occupied(square))
                && !board.is_occupied(to);
        }
        return false;
    }

    // diagonal steps are captures only
    file_delta.abs() == 1 && rank_delta == direction && board.is_occupied_by(to, color.opponent())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Position {
        name.parse().unwrap()
    }

    fn piece(name: &str) -> Piece {
        name.parse().unwrap()
    }

    fn board(pieces: &[(&str, &str)]) -> Board {
        Board::from_pieces(pieces.iter().map(|(square, name)| (sq(square), piece(name))))
    }

    #[test]
    fn never_lands_on_own_piece() {
        let start = Board::starting();
        for (from, moving) in start.pieces() {
            for (to, _) in start.pieces_of(moving.color) {
                assert!(!is_legal_move(moving, from, to, &start), "{} {} -> {}", moving, from, to);
            }
        }
    }

    #[test]
    fn pawn_single_and_double_steps_from_home_rank() {
        let start = Board::starting();
        let white_pawn = piece("white_pawn");
        let black_pawn = piece("black_pawn");

        assert!(is_legal_move(white_pawn, sq("e2"), sq("e3"), &start));
        assert!(is_legal_move(white_pawn, sq("e2"), sq("e4"), &start));
        assert!(!is_legal_move(white_pawn, sq("e2"), sq("e5"), &start));
        assert!(is_legal_move(black_pawn, sq("f7"), sq("f5"), &start));
        assert!(!is_legal_move(black_pawn, sq("f7"), sq("f4"), &start));
        // backwards
        assert!(!is_legal_move(black_pawn, sq("f7"), sq("f8"), &start));
    }

    #[test]
    fn pawn_double_step_only_from_home_rank() {
        let position = board(&[("e3", "white_pawn"), ("d6", "black_pawn")]);
        assert!(!is_legal_move(piece("white_pawn"), sq("e3"), sq("e5"), &position));
        assert!(!is_legal_move(piece("black_pawn"), sq("d6"), sq("d4"), &position));
    }

    #[test]
    fn blocked_pawn_cannot_double_step() {
        for blocker in ["white_knight", "black_knight"] {
            let position = board(&[("e2", "white_pawn"), ("e3", blocker)]);
            assert!(!is_legal_move(piece("white_pawn"), sq("e2"), sq("e4"), &position));
            assert!(!is_legal_move(piece("white_pawn"), sq("e2"), sq("e3"), &position));
        }
        let position = board(&[("e2", "white_pawn"), ("e4", "black_knight")]);
        assert!(!is_legal_move(piece("white_pawn"), sq("e2"), sq("e4"), &position));
    }

    #[test]
    fn pawn_captures_diagonally_only() {
        let position = board(&[
            ("d4", "white_pawn"),
            ("e5", "black_rook"),
            ("c5", "white_rook"),
            ("d5", "black_pawn"),
        ]);
        let pawn = piece("white_pawn");
        assert!(is_legal_move(pawn, sq("d4"), sq("e5"), &position));
        assert!(!is_legal_move(pawn, sq("d4"), sq("c5"), &position));
        assert!(!is_legal_move(pawn, sq("d4"), sq("d5"), &position));
        // empty diagonal
        let lone = board(&[("d4", "white_pawn")]);
        assert!(!is_legal_move(pawn, sq("d4"), sq("e5"), &lone));
    }

    #[test]
    fn knight_jumps_over_pieces() {
        let start = Board::starting();
        let knight = piece("white_knight");
        assert!(is_legal_move(knight, sq("g1"), sq("f3"), &start));
        assert!(is_legal_move(knight, sq("g1"), sq("h3"), &start));
        assert!(!is_legal_move(knight, sq("g1"), sq("g3"), &start));
    }

    #[test]
    fn rook_is_blocked_by_either_color() {
        let rook = piece("white_rook");
        for blocker in ["white_pawn", "black_pawn"] {
            let position = board(&[("a1", "white_rook"), ("a4", blocker), ("a8", "black_rook")]);
            assert!(!is_legal_move(rook, sq("a1"), sq("a8"), &position));
            assert!(!is_legal_move(rook, sq("a1"), sq("a5"), &position));
            assert!(is_legal_move(rook, sq("a1"), sq("a3"), &position));
        }
        let open = board(&[("a1", "white_rook"), ("a8", "black_rook")]);
        assert!(is_legal_move(rook, sq("a1"), sq("a8"), &open));
        assert!(is_legal_move(rook, sq("a1"), sq("h1"), &open));
        assert!(!is_legal_move(rook, sq("a1"), sq("b2"), &open));
    }

    #[test]
    fn bishop_moves_strictly_diagonally() {
        let bishop = piece("black_bishop");
        let position = board(&[("c8", "black_bishop"), ("e6", "white_pawn")]);
        assert!(is_legal_move(bishop, sq("c8"), sq("e6"), &position));
        assert!(!is_legal_move(bishop, sq("c8"), sq("f5"), &position));
        assert!(is_legal_move(bishop, sq("c8"), sq("a6"), &position));
        assert!(!is_legal_move(bishop, sq("c8"), sq("c5"), &position));
    }

    #[test]
    fn queen_combines_rook_and_bishop() {
        let queen = piece("white_queen");
        let position = board(&[("d4", "white_queen")]);
        assert!(is_legal_move(queen, sq("d4"), sq("d8"), &position));
        assert!(is_legal_move(queen, sq("d4"), sq("h8"), &position));
        assert!(is_legal_move(queen, sq("d4"), sq("a4"), &position));
        assert!(!is_legal_move(queen, sq("d4"), sq("e6"), &position));
    }

    #[test]
    fn king_moves_one_square() {
        let king = piece("white_king");
        let position = board(&[("e1", "white_king")]);
        assert!(is_legal_move(king, sq("e1"), sq("f2"), &position));
        assert!(is_legal_move(king, sq("e1"), sq("d1"), &position));
        assert!(!is_legal_move(king, sq("e1"), sq("e3"), &position));
        assert!(!is_legal_move(king, sq("e1"), sq("g1"), &position));
        assert!(!is_legal_move(king, sq("e1"), sq("e1"), &position));
    }
}

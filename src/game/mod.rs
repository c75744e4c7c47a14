pub mod board;
pub mod detector;
pub mod rules;

pub use board::{Board, Color, Piece, PieceKind, Position};

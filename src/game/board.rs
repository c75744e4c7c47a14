use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::GameError;

/// Side of the board
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank step a pawn of this color advances by
    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Zero-based rank the pawns of this color start on
    pub fn pawn_home_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    fn name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "pawn",
            PieceKind::Knight => "knight",
            PieceKind::Bishop => "bishop",
            PieceKind::Rook => "rook",
            PieceKind::Queen => "queen",
            PieceKind::King => "king",
        }
    }

    fn symbol(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

/// A colored piece. Serialized as `"<color>_<kind>"`, e.g. `"white_pawn"`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(into = "String", try_from = "String")]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Piece { color, kind }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.color, self.kind.name())
    }
}

impl FromStr for Piece {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (color, kind) = s
            .split_once('_')
            .ok_or_else(|| GameError::InvalidPiece(s.to_string()))?;
        let color = match color {
            "white" => Color::White,
            "black" => Color::Black,
            _ => return Err(GameError::InvalidPiece(s.to_string())),
        };
        let kind = match kind {
            "pawn" => PieceKind::Pawn,
            "knight" => PieceKind::Knight,
            "bishop" => PieceKind::Bishop,
            "rook" => PieceKind::Rook,
            "queen" => PieceKind::Queen,
            "king" => PieceKind::King,
            _ => return Err(GameError::InvalidPiece(s.to_string())),
        };
        Ok(Piece::new(color, kind))
    }
}

impl From<Piece> for String {
    fn from(piece: Piece) -> Self {
        piece.to_string()
    }
}

impl TryFrom<String> for Piece {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A square on the board, `a1` through `h8`.
///
/// File and rank are stored zero-based; construction outside the board is
/// impossible, so every `Position` is valid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "String", try_from = "String")]
pub struct Position {
    file: u8,
    rank: u8,
}

impl Position {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Position { file, rank })
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    fn index(self) -> usize {
        usize::from(self.rank) * 8 + usize::from(self.file)
    }

    fn from_index(index: usize) -> Self {
        Position {
            file: (index % 8) as u8,
            rank: (index / 8) as u8,
        }
    }

    /// All 64 squares, rank by rank from a1.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..64).map(Position::from_index)
    }

    /// Signed (file, rank) distance from `self` to `other`
    pub fn delta(self, other: Position) -> (i8, i8) {
        (
            other.file as i8 - self.file as i8,
            other.rank as i8 - self.rank as i8,
        )
    }

    pub fn offset(self, file_step: i8, rank_step: i8) -> Option<Position> {
        let file = self.file as i8 + file_step;
        let rank = self.rank as i8 + rank_step;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Position {
                file: file as u8,
                rank: rank as u8,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl FromStr for Position {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_bytes() {
            [file @ b'a'..=b'h', rank @ b'1'..=b'8'] => Ok(Position {
                file: file - b'a',
                rank: rank - b'1',
            }),
            _ => Err(GameError::InvalidPosition(s.to_string())),
        }
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.to_string()
    }
}

impl TryFrom<String> for Position {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Immutable 64-square snapshot of piece placement.
///
/// Every mutation returns a new value, so hypothetical boards built during
/// check detection never alias the committed one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; 64],
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Board {
    pub fn empty() -> Self {
        Board {
            squares: [None; 64],
        }
    }

    /// Standard chess starting setup
    pub fn starting() -> Self {
        let mut squares = [None; 64];
        for (file, kind) in BACK_RANK.iter().enumerate() {
            squares[file] = Some(Piece::new(Color::White, *kind));
            squares[8 + file] = Some(Piece::new(Color::White, PieceKind::Pawn));
            squares[48 + file] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            squares[56 + file] = Some(Piece::new(Color::Black, *kind));
        }
        Board { squares }
    }

    pub fn from_pieces(pieces: impl IntoIterator<Item = (Position, Piece)>) -> Self {
        let mut squares = [None; 64];
        for (position, piece) in pieces {
            squares[position.index()] = Some(piece);
        }
        Board { squares }
    }

    pub fn occupant_at(&self, position: Position) -> Option<Piece> {
        self.squares[position.index()]
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.squares[position.index()].is_some()
    }

    pub fn is_occupied_by(&self, position: Position, color: Color) -> bool {
        matches!(self.occupant_at(position), Some(piece) if piece.color == color)
    }

    /// Returns a new board with the piece on `from` relocated to `to`,
    /// dropping whatever stood on `to`.
    pub fn with_move(&self, from: Position, to: Position) -> Board {
        let mut next = *self;
        next.squares[to.index()] = next.squares[from.index()].take();
        next
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(index, square)| square.map(|piece| (Position::from_index(index), piece)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.color == color)
    }

    pub fn king_position(&self, color: Color) -> Option<Position> {
        self.pieces_of(color)
            .find(|(_, piece)| piece.kind == PieceKind::King)
            .map(|(position, _)| position)
    }

    /// True when `from` and `to` share a rank, file or diagonal and every
    /// square strictly between them is empty.
    pub fn is_path_clear(&self, from: Position, to: Position) -> bool {
        let (file_delta, rank_delta) = from.delta(to);
        if file_delta != 0 && rank_delta != 0 && file_delta.abs() != rank_delta.abs() {
            return false;
        }
        let step = (file_delta.signum(), rank_delta.signum());
        if step == (0, 0) {
            return true;
        }

        let mut current = from.offset(step.0, step.1);
        while let Some(square) = current {
            if square == to {
                return true;
            }
            if self.is_occupied(square) {
                return false;
            }
            current = square.offset(step.0, step.1);
        }
        false
    }

    /// Rank-flipped copy with every piece's color swapped.
    pub fn mirrored(&self) -> Board {
        Board::from_pieces(self.pieces().map(|(position, piece)| {
            let flipped = Position {
                file: position.file,
                rank: 7 - position.rank,
            };
            (flipped, Piece::new(piece.color.opponent(), piece.kind))
        }))
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pieces().count()))?;
        for (position, piece) in self.pieces() {
            map.serialize_entry(&position, &piece)?;
        }
        map.end()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let square = Position { file, rank };
                let symbol = match self.occupant_at(square) {
                    Some(piece) if piece.color == Color::White => {
                        piece.kind.symbol().to_ascii_uppercase()
                    }
                    Some(piece) => piece.kind.symbol(),
                    None => '.',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board(\n{})", self)
    }
}

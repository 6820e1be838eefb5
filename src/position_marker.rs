//! Serialized position snapshots stored with every history entry.
//!
//! A marker is the FEN text of the board immediately before a move. The side
//! to move and the fullmove counter are decoded once at construction, so the
//! move list can place an entry without replaying the game.

use std::fmt;
use std::str::FromStr;

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

use crate::error::GameError;
use crate::types::Side;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMarker {
    fen: String,
    side_to_move: Side,
    fullmove_number: u32,
}

impl PositionMarker {
    /// Snapshot a live position.
    pub fn from_position(pos: &Chess) -> Self {
        let fen = Fen::from_position(pos, EnPassantMode::Legal);
        PositionMarker {
            fen: fen.to_string(),
            side_to_move: side_of(pos.turn()),
            fullmove_number: pos.fullmoves().get(),
        }
    }

    /// Marker of the standard initial position.
    pub fn standard() -> Self {
        Self::from_position(&Chess::default())
    }

    pub fn as_str(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn is_standard_start(&self) -> bool {
        *self == Self::standard()
    }

    /// Rebuild the position this marker was taken from.
    pub fn to_position(&self) -> Result<Chess, GameError> {
        parse_position(&self.fen)
    }
}

impl fmt::Display for PositionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen)
    }
}

impl FromStr for PositionMarker {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_position(s).map(|pos| PositionMarker::from_position(&pos))
    }
}

/// Parse FEN text into a legal standard-chess position.
pub(crate) fn parse_position(text: &str) -> Result<Chess, GameError> {
    let fen: Fen = text
        .trim()
        .parse()
        .map_err(|e| GameError::InvalidPosition(format!("failed to parse FEN: {}", e)))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|e| GameError::InvalidPosition(format!("invalid FEN position: {}", e)))
}

pub(crate) fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

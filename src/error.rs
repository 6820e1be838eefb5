use std::path::PathBuf;

use crate::types::PieceKind;

/// Errors surfaced to the presentation layer as short status messages.
///
/// Illegal interaction requests (confirm while the game is over, confirm away
/// from the history tip, selecting an empty square) are not errors; the
/// selection controller swallows them.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("invalid game record: {0}")]
    InvalidRecord(String),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("cannot promote to {}", .0.name())]
    InvalidPromotion(PieceKind),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

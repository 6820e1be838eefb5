//! The rules oracle consulted by the history store and the selection controller.
//!
//! `RulesEngine` is the narrow interface the rest of the crate depends on.
//! `ShakmatyEngine` implements it on top of `shakmaty`, adding the undo stack
//! and repetition bookkeeping that `shakmaty` leaves to callers.

use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Chess, EnPassantMode, Position, Role};
use tracing::debug;

use crate::error::GameError;
use crate::position_marker::{parse_position, side_of, PositionMarker};
use crate::types::{GameResult, Move, Piece, PieceKind, Side, Square};

/// Why a game ended. Variants are listed in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoves,
    FivefoldRepetition,
}

impl TerminalState {
    pub fn result(self) -> GameResult {
        match self {
            TerminalState::Checkmate { winner } => GameResult::win_for(winner),
            _ => GameResult::Draw,
        }
    }

    /// User-facing status line.
    pub fn label(self) -> String {
        match self {
            TerminalState::Checkmate { .. } => format!("Checkmate! {}", self.result()),
            TerminalState::Stalemate => "Draw by Stalemate".to_string(),
            TerminalState::InsufficientMaterial => "Draw by Insufficient Material".to_string(),
            TerminalState::SeventyFiveMoves => "Draw by 75-move rule".to_string(),
            TerminalState::FivefoldRepetition => "Draw by Fivefold Repetition".to_string(),
        }
    }
}

/// One live board position plus the queries the core needs about it.
pub trait RulesEngine {
    /// Sorted, de-duplicated destinations of the legal moves starting on `from`
    /// for the side to move.
    fn legal_destinations(&self, from: Square) -> Vec<Square>;

    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// Play `mv` on the live position. Fails without mutating if it is illegal.
    fn apply(&mut self, mv: Move) -> Result<(), GameError>;

    /// Revert the last applied move. Returns false if there is nothing to revert.
    fn undo_last(&mut self) -> bool;

    /// Back to the standard initial position with no undo history.
    fn reset(&mut self);

    fn is_checkmate(&self) -> bool;
    fn is_stalemate(&self) -> bool;
    fn is_insufficient_material(&self) -> bool;
    fn is_seventyfive_moves(&self) -> bool;
    fn is_fivefold_repetition(&self) -> bool;

    fn side_to_move(&self) -> Side;
    fn fullmove_number(&self) -> u32;

    fn export_position(&self) -> PositionMarker;

    /// Replace the live position. Malformed text leaves the position untouched.
    fn import_position(&mut self, text: &str) -> Result<(), GameError>;

    /// Human-readable name of `mv` as played from `before`.
    fn to_notation(&self, before: &PositionMarker, mv: Move) -> Result<String, GameError>;

    /// First matching terminal condition, in fixed priority order.
    fn terminal_state(&self) -> Option<TerminalState> {
        if self.is_checkmate() {
            Some(TerminalState::Checkmate {
                winner: self.side_to_move().opponent(),
            })
        } else if self.is_stalemate() {
            Some(TerminalState::Stalemate)
        } else if self.is_insufficient_material() {
            Some(TerminalState::InsufficientMaterial)
        } else if self.is_seventyfive_moves() {
            Some(TerminalState::SeventyFiveMoves)
        } else if self.is_fivefold_repetition() {
            Some(TerminalState::FivefoldRepetition)
        } else {
            None
        }
    }

    fn is_game_over(&self) -> bool {
        self.terminal_state().is_some()
    }
}

/// `RulesEngine` backed by a `shakmaty::Chess` position.
#[derive(Debug, Clone)]
pub struct ShakmatyEngine {
    position: Chess,
    // Positions before each applied move, newest last.
    undo: Vec<Chess>,
    // Zobrist key of every position reached since the last reset/import,
    // including the current one.
    keys: Vec<Zobrist64>,
}

impl Default for ShakmatyEngine {
    fn default() -> Self {
        Self::from_chess(Chess::default())
    }
}

impl ShakmatyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(text: &str) -> Result<Self, GameError> {
        parse_position(text).map(Self::from_chess)
    }

    fn from_chess(position: Chess) -> Self {
        let key = position.zobrist_hash::<Zobrist64>(EnPassantMode::Legal);
        ShakmatyEngine {
            position,
            undo: Vec::new(),
            keys: vec![key],
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn fen(&self) -> String {
        self.export_position().to_string()
    }
}

impl RulesEngine for ShakmatyEngine {
    fn legal_destinations(&self, from: Square) -> Vec<Square> {
        let from = to_shakmaty(from);
        let mut targets: Vec<Square> = self
            .position
            .legal_moves()
            .into_iter()
            .filter_map(|m| match UciMove::from_standard(m) {
                UciMove::Normal { from: f, to, .. } if f == from => Square::from_index(to as u8),
                _ => None,
            })
            .collect();
        // Promotions yield one move per piece kind onto the same square.
        targets.sort();
        targets.dedup();
        targets
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position
            .board()
            .piece_at(to_shakmaty(square))
            .map(|p| Piece {
                side: side_of(p.color),
                kind: kind_of(p.role),
            })
    }

    fn apply(&mut self, mv: Move) -> Result<(), GameError> {
        let m = resolve(&self.position, mv)?;
        self.undo.push(self.position.clone());
        self.position.play_unchecked(m);
        self.keys.push(self.position.zobrist_hash::<Zobrist64>(EnPassantMode::Legal));
        debug!(%mv, "applied move");
        Ok(())
    }

    fn undo_last(&mut self) -> bool {
        match self.undo.pop() {
            Some(previous) => {
                self.position = previous;
                self.keys.pop();
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn is_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    fn is_seventyfive_moves(&self) -> bool {
        self.position.halfmoves() >= 150 && !self.position.legal_moves().is_empty()
    }

    fn is_fivefold_repetition(&self) -> bool {
        match self.keys.last() {
            Some(current) => self.keys.iter().filter(|k| *k == current).count() >= 5,
            None => false,
        }
    }

    fn side_to_move(&self) -> Side {
        side_of(self.position.turn())
    }

    fn fullmove_number(&self) -> u32 {
        self.position.fullmoves().get()
    }

    fn export_position(&self) -> PositionMarker {
        PositionMarker::from_position(&self.position)
    }

    fn import_position(&mut self, text: &str) -> Result<(), GameError> {
        let position = parse_position(text)?;
        *self = Self::from_chess(position);
        Ok(())
    }

    fn to_notation(&self, before: &PositionMarker, mv: Move) -> Result<String, GameError> {
        let mut pos = before.to_position()?;
        let m = resolve(&pos, mv)?;
        Ok(SanPlus::from_move_and_play_unchecked(&mut pos, m).to_string())
    }
}

/// Match a move request against the legal moves of `pos`.
fn resolve(pos: &Chess, mv: Move) -> Result<shakmaty::Move, GameError> {
    let uci = UciMove::Normal {
        from: to_shakmaty(mv.from),
        to: to_shakmaty(mv.to),
        promotion: mv.promotion.map(role_of),
    };
    uci.to_move(pos)
        .map_err(|e| GameError::IllegalMove(format!("{} ({})", mv, e)))
}

/// Convert a `shakmaty` move into a move request. Castling becomes the king's
/// two-square step.
pub(crate) fn move_of(m: shakmaty::Move) -> Option<Move> {
    match UciMove::from_standard(m) {
        UciMove::Normal {
            from,
            to,
            promotion,
        } => Some(Move {
            from: Square::from_index(from as u8)?,
            to: Square::from_index(to as u8)?,
            promotion: promotion.map(kind_of),
        }),
        _ => None,
    }
}

fn to_shakmaty(square: Square) -> shakmaty::Square {
    shakmaty::Square::new(u32::from(square.index()))
}

fn kind_of(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn role_of(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

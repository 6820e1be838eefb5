//! Selection state machine: turns hover/confirm input into move requests.
//!
//! States:
//! - `Hovering`: nothing selected; `candidate_targets` are the hovered square's moves.
//! - `Selected(square)`: a piece is picked up; hover steps cycle through its targets.
//! - `PromotionPending`: a pawn move onto the last rank waits for a piece choice.
//!   Board input is not processed until `Promote`, `CancelPromotion` or `Deselect`.

use tracing::{debug, info};

use crate::error::GameError;
use crate::history::HistoryStore;
use crate::rules::RulesEngine;
use crate::types::{Direction, Move, PieceKind, Square};

/// Raw interaction events from a keyboard or pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Keyboard step.
    Hover(Direction),
    /// Pointer moved over a square.
    HoverAt(Square),
    /// Confirm the hovered square.
    Confirm,
    /// Pointer click: hover the square, then confirm it.
    ConfirmAt(Square),
    Deselect,
    Promote(PieceKind),
    CancelPromotion,
}

/// A pawn move onto the last rank that still needs its promotion kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPromotion {
    mv: Move,
}

impl PendingPromotion {
    pub fn mv(&self) -> Move {
        self.mv
    }

    pub fn from(&self) -> Square {
        self.mv.from
    }

    pub fn to(&self) -> Square {
        self.mv.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Hovering,
    Selected(Square),
    PromotionPending(PendingPromotion),
}

/// What a handled event did, for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Guarded or meaningless in the current state; nothing changed.
    Ignored,
    /// Hover, selection or candidate targets changed.
    SelectionChanged,
    /// A promotion choice is needed before the move can complete.
    PromotionRequested(PendingPromotion),
    /// A move was added to the history.
    Committed(Move),
}

#[derive(Debug, Clone)]
pub struct SelectionController {
    hovered: Square,
    state: SelectionState,
    candidate_targets: Vec<Square>,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionController {
    /// Hovering the a1 corner with no targets computed yet; call `reset` with
    /// the live engine before use.
    pub fn new() -> Self {
        SelectionController {
            hovered: Square::A1,
            state: SelectionState::Hovering,
            candidate_targets: Vec::new(),
        }
    }

    pub fn hovered(&self) -> Square {
        self.hovered
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected(&self) -> Option<Square> {
        match self.state {
            SelectionState::Selected(square) => Some(square),
            SelectionState::PromotionPending(pending) => Some(pending.from()),
            SelectionState::Hovering => None,
        }
    }

    pub fn pending_promotion(&self) -> Option<PendingPromotion> {
        match self.state {
            SelectionState::PromotionPending(pending) => Some(pending),
            _ => None,
        }
    }

    /// Legal destinations of the selected square, or of the hovered one when
    /// nothing is selected.
    pub fn candidate_targets(&self) -> &[Square] {
        &self.candidate_targets
    }

    /// Game reset: back to the home corner with nothing selected.
    pub fn reset<E: RulesEngine>(&mut self, engine: &E) {
        self.hovered = Square::A1;
        self.hover_only(engine);
    }

    /// The live position changed underneath us (navigation, undo, load):
    /// drop any selection and recompute targets for the hovered square.
    pub fn resync<E: RulesEngine>(&mut self, engine: &E) {
        self.hover_only(engine);
    }

    pub fn handle<E: RulesEngine>(
        &mut self,
        event: InputEvent,
        history: &mut HistoryStore<E>,
    ) -> Result<Signal, GameError> {
        if let SelectionState::PromotionPending(pending) = self.state {
            return match event {
                InputEvent::Promote(kind) => self.promote(pending, kind, history),
                InputEvent::CancelPromotion => Ok(self.cancel_promotion(pending, history.engine())),
                InputEvent::Deselect => Ok(self.deselect(history.engine())),
                _ => {
                    debug!(?event, "board input ignored while a promotion is pending");
                    Ok(Signal::Ignored)
                }
            };
        }

        match event {
            InputEvent::Hover(direction) => Ok(self.hover_step(direction, history.engine())),
            InputEvent::HoverAt(square) => Ok(self.hover_at(square, history.engine())),
            InputEvent::Confirm => self.confirm(history),
            InputEvent::ConfirmAt(square) => {
                if self.state == SelectionState::Hovering && history.engine().is_game_over() {
                    return Ok(Signal::Ignored);
                }
                self.hovered = square;
                self.confirm(history)
            }
            InputEvent::Deselect => Ok(self.deselect(history.engine())),
            InputEvent::Promote(_) | InputEvent::CancelPromotion => Ok(Signal::Ignored),
        }
    }

    fn hover_only<E: RulesEngine>(&mut self, engine: &E) {
        self.state = SelectionState::Hovering;
        self.candidate_targets = engine.legal_destinations(self.hovered);
    }

    fn hover_step<E: RulesEngine>(&mut self, direction: Direction, engine: &E) -> Signal {
        match self.state {
            SelectionState::Selected(square) => {
                self.candidate_targets = engine.legal_destinations(square);
                let targets = &self.candidate_targets;
                if targets.is_empty() {
                    return Signal::Ignored;
                }
                let n = targets.len();
                let next = match targets.iter().position(|&t| t == self.hovered) {
                    Some(i) if direction.is_forward() => (i + 1) % n,
                    Some(i) => (i + n - 1) % n,
                    None => 0,
                };
                self.hovered = targets[next];
                Signal::SelectionChanged
            }
            _ => {
                if engine.is_game_over() {
                    return Signal::Ignored;
                }
                self.hovered = self.hovered.step_clamped(direction);
                self.candidate_targets = engine.legal_destinations(self.hovered);
                Signal::SelectionChanged
            }
        }
    }

    fn hover_at<E: RulesEngine>(&mut self, square: Square, engine: &E) -> Signal {
        match self.state {
            SelectionState::Selected(_) => {
                if !self.candidate_targets.contains(&square) {
                    return Signal::Ignored;
                }
                self.hovered = square;
                Signal::SelectionChanged
            }
            _ => {
                if engine.is_game_over() {
                    return Signal::Ignored;
                }
                self.hovered = square;
                self.candidate_targets = engine.legal_destinations(square);
                Signal::SelectionChanged
            }
        }
    }

    fn confirm<E: RulesEngine>(&mut self, history: &mut HistoryStore<E>) -> Result<Signal, GameError> {
        let hovered = self.hovered;
        let SelectionState::Selected(selected) = self.state else {
            if history.engine().is_game_over() {
                debug!(%hovered, "selection ignored, game is over");
                return Ok(Signal::Ignored);
            }
            return Ok(self.select(hovered, history.engine()));
        };

        if hovered == selected {
            return Ok(self.deselect(history.engine()));
        }

        let targets = history.engine().legal_destinations(selected);
        if !targets.contains(&hovered) {
            return Ok(self.select(hovered, history.engine()));
        }

        if history.engine().is_game_over() {
            info!("Cannot make a move when the game is over.");
            return Ok(Signal::Ignored);
        }
        if !history.is_at_tip() {
            info!("Cannot make a move when not at the end of the move history.");
            return Ok(Signal::Ignored);
        }

        let mv = Move::new(selected, hovered);
        if is_promotion(history.engine(), mv) {
            let pending = PendingPromotion { mv };
            self.state = SelectionState::PromotionPending(pending);
            debug!(%mv, "awaiting promotion choice");
            return Ok(Signal::PromotionRequested(pending));
        }
        self.commit(mv, history)
    }

    /// Pick up `square` if it has legal moves, otherwise just hover it.
    fn select<E: RulesEngine>(&mut self, square: Square, engine: &E) -> Signal {
        let targets = engine.legal_destinations(square);
        if targets.is_empty() {
            return match self.state {
                SelectionState::Hovering => {
                    debug!(%square, "no legal moves from square");
                    self.candidate_targets = targets;
                    Signal::Ignored
                }
                _ => {
                    self.state = SelectionState::Hovering;
                    self.candidate_targets = targets;
                    Signal::SelectionChanged
                }
            };
        }
        self.state = SelectionState::Selected(square);
        self.candidate_targets = targets;
        Signal::SelectionChanged
    }

    fn deselect<E: RulesEngine>(&mut self, engine: &E) -> Signal {
        self.hover_only(engine);
        Signal::SelectionChanged
    }

    fn promote<E: RulesEngine>(
        &mut self,
        pending: PendingPromotion,
        kind: PieceKind,
        history: &mut HistoryStore<E>,
    ) -> Result<Signal, GameError> {
        if !kind.is_promotion_choice() {
            return Err(GameError::InvalidPromotion(kind));
        }
        info!(
            from = %pending.from(),
            to = %pending.to(),
            piece = kind.name(),
            "promotion chosen"
        );
        self.commit(pending.mv.with_promotion(kind), history)
    }

    fn cancel_promotion<E: RulesEngine>(&mut self, pending: PendingPromotion, engine: &E) -> Signal {
        self.state = SelectionState::Selected(pending.from());
        self.hovered = pending.to();
        self.candidate_targets = engine.legal_destinations(pending.from());
        Signal::SelectionChanged
    }

    fn commit<E: RulesEngine>(&mut self, mv: Move, history: &mut HistoryStore<E>) -> Result<Signal, GameError> {
        history.add_move(mv)?;
        self.hover_only(history.engine());
        Ok(Signal::Committed(mv))
    }
}

/// A pawn moving onto rank 0 or rank 7.
fn is_promotion<E: RulesEngine>(engine: &E, mv: Move) -> bool {
    let is_pawn = engine
        .piece_at(mv.from)
        .is_some_and(|piece| piece.kind == PieceKind::Pawn);
    is_pawn && mv.to.is_back_rank()
}

//! One game session: the live engine, its history, the selection machine and
//! the derived move list, kept consistent behind a single set of operations.
//!
//! Every operation returns a [`StateChange`] so a front end can repaint once
//! per transition instead of tracking which labels a mutation touched.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::commands::Command;
use crate::config::SessionConfig;
use crate::error::GameError;
use crate::game_io;
use crate::history::HistoryStore;
use crate::move_list::{MoveCell, MoveListProjection};
use crate::rules::{RulesEngine, ShakmatyEngine};
use crate::selection::{InputEvent, PendingPromotion, SelectionController, Signal};
use crate::types::{GameResult, Move};

/// Status message shown when position text does not parse.
pub const INVALID_FEN_MESSAGE: &str = "Error: Invalid FEN string";

/// What an operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    None,
    /// Hover, selection or candidate targets.
    Selection,
    /// The live position moved without a new move being played.
    Position,
    Committed(Move),
    PromotionRequested(PendingPromotion),
}

impl StateChange {
    pub fn as_str(self) -> &'static str {
        match self {
            StateChange::None => "none",
            StateChange::Selection => "selection",
            StateChange::Position => "position",
            StateChange::Committed(_) => "committed",
            StateChange::PromotionRequested(_) => "promotion_requested",
        }
    }
}

pub struct GameSession<E: RulesEngine = ShakmatyEngine> {
    config: SessionConfig,
    // Validated starting FEN, used by `new_game`.
    start_fen: Option<String>,
    history: HistoryStore<E>,
    selection: SelectionController,
    projection: MoveListProjection,
    terminal_label: String,
    status: String,
}

impl GameSession<ShakmatyEngine> {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_engine(ShakmatyEngine::new(), config)
    }
}

impl Default for GameSession<ShakmatyEngine> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<E: RulesEngine> GameSession<E> {
    /// Start a session on `engine`. An invalid configured starting position
    /// is reported through the status message and the engine's own position
    /// is kept.
    pub fn with_engine(engine: E, config: SessionConfig) -> Self {
        let mut session = GameSession {
            start_fen: None,
            history: HistoryStore::new(engine),
            selection: SelectionController::new(),
            projection: MoveListProjection::default(),
            terminal_label: String::new(),
            status: String::new(),
            config,
        };
        if let Some(fen) = session.config.start_fen.clone() {
            match session.history.set_from_position(&fen) {
                Ok(()) => session.start_fen = Some(fen),
                Err(err) => {
                    warn!(%err, fen = %fen, "ignoring invalid starting position");
                    session.status = INVALID_FEN_MESSAGE.to_string();
                }
            }
        }
        session.selection.reset(session.history.engine());
        session.refresh();
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore<E> {
        &self.history
    }

    pub fn engine(&self) -> &E {
        self.history.engine()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn projection(&self) -> &MoveListProjection {
        &self.projection
    }

    /// Move-list cell of the entry under the cursor.
    pub fn highlighted_cell(&self) -> Option<MoveCell> {
        self.history
            .cursor()
            .and_then(|index| self.projection.cell_for(index))
    }

    pub fn turn_label(&self) -> String {
        format!("{}'s Turn", self.engine().side_to_move().name())
    }

    /// Terminal-state label of the live position; empty while play goes on.
    pub fn terminal_label(&self) -> &str {
        &self.terminal_label
    }

    /// Last validation or file message; empty when there is nothing to report.
    pub fn status_message(&self) -> &str {
        &self.status
    }

    pub fn fen(&self) -> String {
        self.engine().export_position().to_string()
    }

    pub fn is_game_over(&self) -> bool {
        self.engine().is_game_over()
    }

    /// Result tag recorded by the last commit, load or undo. Stepping back
    /// through the history leaves it alone, so it may disagree with
    /// `terminal_label`, which describes the live position.
    pub fn recorded_result(&self) -> GameResult {
        self.history.recorded_result()
    }

    /// Route one board input through the selection machine.
    pub fn handle(&mut self, event: InputEvent) -> Result<StateChange, GameError> {
        let signal = match self.selection.handle(event, &mut self.history) {
            Ok(signal) => signal,
            Err(err) => {
                self.status = format!("Error: {}", err);
                return Err(err);
            }
        };
        Ok(match signal {
            Signal::Ignored => StateChange::None,
            Signal::SelectionChanged => StateChange::Selection,
            Signal::PromotionRequested(pending) => StateChange::PromotionRequested(pending),
            Signal::Committed(mv) => {
                self.history.record_result(self.history.result());
                self.status.clear();
                self.refresh();
                if !self.terminal_label.is_empty() {
                    info!(result = %self.history.recorded_result(), "{}", self.terminal_label);
                }
                StateChange::Committed(mv)
            }
        })
    }

    pub fn forward(&mut self) -> StateChange {
        if !self.history.forward_move() {
            return StateChange::None;
        }
        self.position_changed()
    }

    pub fn backward(&mut self) -> StateChange {
        if !self.history.backward_move() {
            return StateChange::None;
        }
        self.position_changed()
    }

    /// Drop the newest move.
    pub fn undo(&mut self) -> StateChange {
        let Some(entry) = self.history.pop_move() else {
            return StateChange::None;
        };
        debug!(mv = %entry.mv(), "undid move");
        // Moves are only played from a non-terminal tip, so the new tip is
        // never a finished game.
        self.history.record_result(GameResult::Ongoing);
        self.position_changed()
    }

    /// Back to the configured starting position with an empty history.
    pub fn new_game(&mut self) -> StateChange {
        match self.start_fen.as_deref() {
            Some(fen) => {
                if let Err(err) = self.history.set_from_position(fen) {
                    warn!(%err, "starting position no longer imports");
                    self.history.clear();
                }
            }
            None => self.history.clear(),
        }
        self.selection.reset(self.history.engine());
        self.status.clear();
        self.refresh();
        info!("new game");
        StateChange::Position
    }

    /// Start a fresh history from position text. Surrounding whitespace and
    /// quotes are ignored; invalid text changes nothing but the status message.
    pub fn set_position(&mut self, text: &str) -> Result<StateChange, GameError> {
        let text = text
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'')
            .trim();
        if let Err(err) = self.history.set_from_position(text) {
            warn!(%err, "rejected position text");
            self.status = INVALID_FEN_MESSAGE.to_string();
            return Err(err);
        }
        self.selection.reset(self.history.engine());
        self.status.clear();
        self.refresh();
        Ok(StateChange::Position)
    }

    pub fn save(&mut self, path: &Path) -> Result<StateChange, GameError> {
        match game_io::save_record(path, &self.history, &self.config.tags) {
            Ok(()) => {
                self.status = format!("Game saved to {}", path.display());
                Ok(StateChange::None)
            }
            Err(err) => {
                self.status = format!("Error: {}", err);
                Err(err)
            }
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<StateChange, GameError> {
        if let Err(err) = game_io::load_record(path, &mut self.history) {
            self.status = format!("Error: {}", err);
            return Err(err);
        }
        self.status = format!("Game loaded from {}", path.display());
        Ok(self.position_changed())
    }

    pub fn execute(&mut self, command: Command) -> Result<StateChange, GameError> {
        match command {
            Command::Input(event) => self.handle(event),
            Command::Forward => Ok(self.forward()),
            Command::Back => Ok(self.backward()),
            Command::Undo => Ok(self.undo()),
            Command::New => Ok(self.new_game()),
            Command::Fen(text) => self.set_position(&text),
            Command::Save(path) => self.save(&path),
            Command::Load(path) => self.load(&path),
            Command::Show | Command::Quit => Ok(StateChange::None),
        }
    }

    /// The live position changed under the selection machine.
    fn position_changed(&mut self) -> StateChange {
        self.selection.resync(self.history.engine());
        self.refresh();
        StateChange::Position
    }

    fn refresh(&mut self) {
        self.projection = MoveListProjection::compute(self.history.entries(), self.history.engine());
        self.terminal_label = self
            .history
            .engine()
            .terminal_state()
            .map(|state| state.label())
            .unwrap_or_default();
    }
}

use std::path::PathBuf;

use pyo3::exceptions::{PyFileNotFoundError, PyOSError, PyValueError};
use pyo3::prelude::*;

use crate::commands::{parse_command, Command};
use crate::config::SessionConfig;
use crate::error::GameError;
use crate::move_list::MoveColumn;
use crate::selection::InputEvent;
use crate::session::GameSession;
use crate::types::{Direction, PieceKind, Square};

fn to_py_err(err: GameError) -> PyErr {
    match err {
        GameError::NotFound(path) => PyFileNotFoundError::new_err(path.display().to_string()),
        GameError::Io(e) => PyOSError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn parse_square(name: &str) -> PyResult<Square> {
    name.trim().to_ascii_lowercase().parse().map_err(to_py_err)
}

fn parse_piece(name: &str) -> PyResult<PieceKind> {
    match name.trim().to_ascii_lowercase().as_str() {
        "q" | "queen" => Ok(PieceKind::Queen),
        "r" | "rook" => Ok(PieceKind::Rook),
        "b" | "bishop" => Ok(PieceKind::Bishop),
        "n" | "knight" => Ok(PieceKind::Knight),
        "k" | "king" => Ok(PieceKind::King),
        "p" | "pawn" => Ok(PieceKind::Pawn),
        other => Err(PyValueError::new_err(format!("unknown piece: {}", other))),
    }
}

fn column_name(column: MoveColumn) -> &'static str {
    match column {
        MoveColumn::White => "white",
        MoveColumn::Black => "black",
    }
}

/// Interactive game session for a Python front end.
///
/// Mutating methods return the kind of change as a string: "none",
/// "selection", "position", "committed" or "promotion_requested".
#[pyclass(name = "GameSession")]
pub struct PyGameSession {
    inner: GameSession,
}

impl PyGameSession {
    fn input(&mut self, event: InputEvent) -> PyResult<&'static str> {
        self.inner
            .handle(event)
            .map(|change| change.as_str())
            .map_err(to_py_err)
    }
}

#[pymethods]
impl PyGameSession {
    #[new]
    #[pyo3(signature = (fen=None))]
    fn new(fen: Option<String>) -> Self {
        let config = match fen {
            Some(fen) => SessionConfig::default().with_start_fen(fen),
            None => SessionConfig::default(),
        };
        PyGameSession {
            inner: GameSession::new(config),
        }
    }

    /// Run one text command, e.g. "click e2" or "fen <text>".
    fn command(&mut self, line: &str) -> PyResult<&'static str> {
        let command = parse_command(line).map_err(to_py_err)?;
        self.inner
            .execute(command)
            .map(|change| change.as_str())
            .map_err(to_py_err)
    }

    /// Keyboard hover step: "up", "down", "left" or "right".
    fn hover(&mut self, direction: &str) -> PyResult<&'static str> {
        let direction = match direction.trim().to_ascii_lowercase().as_str() {
            "up" => Direction::Up,
            "down" => Direction::Down,
            "left" => Direction::Left,
            "right" => Direction::Right,
            other => return Err(PyValueError::new_err(format!("unknown direction: {}", other))),
        };
        self.input(InputEvent::Hover(direction))
    }

    fn hover_at(&mut self, square: &str) -> PyResult<&'static str> {
        let square = parse_square(square)?;
        self.input(InputEvent::HoverAt(square))
    }

    fn confirm(&mut self) -> PyResult<&'static str> {
        self.input(InputEvent::Confirm)
    }

    fn click(&mut self, square: &str) -> PyResult<&'static str> {
        let square = parse_square(square)?;
        self.input(InputEvent::ConfirmAt(square))
    }

    fn deselect(&mut self) -> PyResult<&'static str> {
        self.input(InputEvent::Deselect)
    }

    fn promote(&mut self, piece: &str) -> PyResult<&'static str> {
        let kind = parse_piece(piece)?;
        self.input(InputEvent::Promote(kind))
    }

    fn cancel_promotion(&mut self) -> PyResult<&'static str> {
        self.input(InputEvent::CancelPromotion)
    }

    fn forward(&mut self) -> &'static str {
        self.inner.forward().as_str()
    }

    fn backward(&mut self) -> &'static str {
        self.inner.backward().as_str()
    }

    fn undo(&mut self) -> &'static str {
        self.inner.undo().as_str()
    }

    fn new_game(&mut self) -> &'static str {
        self.inner.new_game().as_str()
    }

    fn set_position(&mut self, fen: &str) -> PyResult<&'static str> {
        self.inner
            .set_position(fen)
            .map(|change| change.as_str())
            .map_err(to_py_err)
    }

    fn save(&mut self, path: PathBuf) -> PyResult<()> {
        self.inner.execute(Command::Save(path)).map(|_| ()).map_err(to_py_err)
    }

    fn load(&mut self, path: PathBuf) -> PyResult<&'static str> {
        self.inner
            .execute(Command::Load(path))
            .map(|change| change.as_str())
            .map_err(to_py_err)
    }

    #[getter]
    fn fen(&self) -> String {
        self.inner.fen()
    }

    #[getter]
    fn turn_label(&self) -> String {
        self.inner.turn_label()
    }

    #[getter]
    fn terminal_label(&self) -> String {
        self.inner.terminal_label().to_string()
    }

    #[getter]
    fn status_message(&self) -> String {
        self.inner.status_message().to_string()
    }

    /// Result tag recorded by the last commit, load or undo.
    #[getter]
    fn recorded_result(&self) -> &'static str {
        self.inner.recorded_result().as_tag()
    }

    #[getter]
    fn is_game_over(&self) -> bool {
        self.inner.is_game_over()
    }

    /// Cursor into the history; -1 before the first move.
    #[getter]
    fn cursor(&self) -> i64 {
        self.inner.history().cursor().map_or(-1, |c| c as i64)
    }

    #[getter]
    fn num_moves(&self) -> usize {
        self.inner.history().len()
    }

    /// Move list rows as (number, white, black), "-" for unplayed moves.
    #[getter]
    fn move_rows(&self) -> Vec<(u32, String, String)> {
        self.inner
            .projection()
            .rows()
            .iter()
            .map(|row| {
                (
                    row.number,
                    row.white_label().to_string(),
                    row.black_label().to_string(),
                )
            })
            .collect()
    }

    /// (row, "white" | "black") of the move under the cursor.
    #[getter]
    fn highlighted_cell(&self) -> Option<(usize, &'static str)> {
        self.inner
            .highlighted_cell()
            .map(|cell| (cell.row, column_name(cell.column)))
    }

    #[getter]
    fn hovered(&self) -> String {
        self.inner.selection().hovered().to_string()
    }

    #[getter]
    fn selected(&self) -> Option<String> {
        self.inner.selection().selected().map(|sq| sq.to_string())
    }

    #[getter]
    fn candidate_targets(&self) -> Vec<String> {
        self.inner
            .selection()
            .candidate_targets()
            .iter()
            .map(|sq| sq.to_string())
            .collect()
    }

    /// (from, to) of a move waiting for its promotion piece.
    #[getter]
    fn pending_promotion(&self) -> Option<(String, String)> {
        self.inner
            .selection()
            .pending_promotion()
            .map(|p| (p.from().to_string(), p.to().to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "<GameSession: {} moves, {}, fen '{}'>",
            self.inner.history().len(),
            self.inner.turn_label(),
            self.inner.fen()
        )
    }
}

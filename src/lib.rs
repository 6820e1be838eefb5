//! Interactive chess game core: a branching move history with a cursor, a
//! hover/confirm selection machine with a promotion sub-flow, and a two-column
//! move list derived from the history.

pub mod commands;
pub mod config;
pub mod error;
pub mod game_io;
pub mod history;
pub mod move_list;
pub mod position_marker;
pub mod rules;
pub mod selection;
pub mod session;
pub mod types;

#[cfg(feature = "python")]
mod python_bindings;

pub use commands::{parse_command, Command};
pub use config::{RecordTags, SessionConfig};
pub use error::GameError;
pub use history::{HistoryEntry, HistoryStore};
pub use move_list::{MoveCell, MoveColumn, MoveListProjection, MoveRow};
pub use position_marker::PositionMarker;
pub use rules::{RulesEngine, ShakmatyEngine, TerminalState};
pub use selection::{InputEvent, PendingPromotion, SelectionController, SelectionState, Signal};
pub use session::{GameSession, StateChange};
pub use types::{Direction, GameResult, Move, Piece, PieceKind, Side, Square};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Chess game session core
#[cfg(feature = "python")]
#[pymodule]
fn chess_history_viewer(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python_bindings::PyGameSession>()?;
    Ok(())
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn play(session: &mut GameSession, from: &str, to: &str) -> StateChange {
        session.handle(InputEvent::ConfirmAt(sq(from))).unwrap();
        session.handle(InputEvent::ConfirmAt(sq(to))).unwrap()
    }

    #[test]
    fn test_opening_moves_fill_move_list() {
        let mut session: GameSession = GameSession::default();
        for (from, to) in [("e2", "e4"), ("e7", "e5"), ("g1", "f3")] {
            assert!(matches!(play(&mut session, from, to), StateChange::Committed(_)));
        }

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history().cursor(), Some(2));
        let rows = session.projection().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].number, rows[0].white_label(), rows[0].black_label()), (1, "e4", "e5"));
        assert_eq!((rows[1].number, rows[1].white_label(), rows[1].black_label()), (2, "Nf3", "-"));
    }

    #[test]
    fn test_promotion_commits_exactly_one_move() {
        let mut session = GameSession::new(
            SessionConfig::default().with_start_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1"),
        );
        let change = play(&mut session, "a7", "a8");
        assert!(matches!(change, StateChange::PromotionRequested(_)));
        assert!(matches!(
            session.selection().state(),
            SelectionState::PromotionPending(_)
        ));
        assert!(session.history().is_empty());

        let change = session.handle(InputEvent::Promote(PieceKind::Queen)).unwrap();
        let StateChange::Committed(mv) = change else {
            panic!("expected a commit, got {:?}", change);
        };
        assert_eq!(mv.promotion, Some(PieceKind::Queen));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.selection().state(), SelectionState::Hovering);

        let notation = session.projection().rows()[0].white_label();
        assert!(notation.trim_end_matches(['+', '#']).ends_with("=Q"), "{}", notation);
    }

    #[test]
    fn test_fools_mate_ends_the_game() {
        let mut session: GameSession = GameSession::default();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            assert!(matches!(play(&mut session, from, to), StateChange::Committed(_)));
        }

        assert_eq!(session.recorded_result(), GameResult::BlackWins);
        assert_eq!(session.history().result(), GameResult::BlackWins);
        assert!(session.is_game_over());
        assert_eq!(session.terminal_label(), "Checkmate! 0-1");

        let fen = session.fen();
        for event in [
            InputEvent::ConfirmAt(sq("e1")),
            InputEvent::Confirm,
            InputEvent::Hover(Direction::Up),
        ] {
            assert_eq!(session.handle(event).unwrap(), StateChange::None);
        }
        assert_eq!(session.fen(), fen);
        assert_eq!(session.history().len(), 4);
    }

    #[test]
    fn test_backward_at_start_is_a_no_op() {
        let mut history: HistoryStore = HistoryStore::default();
        let fen = history.engine().fen();
        assert!(!history.backward_move());
        assert_eq!(history.cursor(), None);
        assert_eq!(history.engine().fen(), fen);

        let mut session: GameSession = GameSession::default();
        assert_eq!(session.backward(), StateChange::None);
        assert_eq!(session.history().cursor(), None);
    }
}

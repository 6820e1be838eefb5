//! Linear, branch-overwriting move history with a navigation cursor.
//!
//! The store owns the live rules-engine position. After every call the live
//! position equals the start position with `entries[..=cursor]` replayed.

use tracing::{debug, error, info};

use crate::error::GameError;
use crate::position_marker::PositionMarker;
use crate::rules::{RulesEngine, ShakmatyEngine};
use crate::types::{GameResult, Move};

/// One played move plus the position it was played from. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    mv: Move,
    position_before: PositionMarker,
}

impl HistoryEntry {
    pub fn mv(&self) -> Move {
        self.mv
    }

    pub fn position_before(&self) -> &PositionMarker {
        &self.position_before
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore<E = ShakmatyEngine> {
    engine: E,
    entries: Vec<HistoryEntry>,
    // None is "before the first move".
    cursor: Option<usize>,
    result: GameResult,
}

impl Default for HistoryStore<ShakmatyEngine> {
    fn default() -> Self {
        Self::new(ShakmatyEngine::default())
    }
}

impl<E: RulesEngine> HistoryStore<E> {
    /// Start an empty history on whatever position `engine` currently holds.
    pub fn new(engine: E) -> Self {
        HistoryStore {
            engine,
            entries: Vec::new(),
            cursor: None,
            result: GameResult::Ongoing,
        }
    }

    /// Read access to the live position.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// True when the live position is the newest one in the history.
    pub fn is_at_tip(&self) -> bool {
        self.cursor == self.entries.len().checked_sub(1)
    }

    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Position the history starts from.
    pub fn start_position(&self) -> PositionMarker {
        match self.entries.first() {
            Some(first) => first.position_before.clone(),
            None => self.engine.export_position(),
        }
    }

    /// Play `mv` from the live position and record it.
    ///
    /// The entry's `position_before` is the live position at call time. When
    /// the cursor is behind the tip, every entry after the cursor is discarded
    /// first; that branch cannot be recovered. An illegal move changes nothing.
    pub fn add_move(&mut self, mv: Move) -> Result<&HistoryEntry, GameError> {
        let position_before = self.engine.export_position();
        self.engine.apply(mv)?;

        let keep = self.cursor.map_or(0, |c| c + 1);
        if keep < self.entries.len() {
            debug!(
                discarded = self.entries.len() - keep,
                "overwriting forward history"
            );
            self.entries.truncate(keep);
        }
        self.entries.push(HistoryEntry {
            mv,
            position_before,
        });
        self.cursor = Some(self.entries.len() - 1);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Remove the newest entry.
    ///
    /// The live position is reverted only when the cursor was on that entry;
    /// if the user is looking at an older position it stays where it is.
    pub fn pop_move(&mut self) -> Option<HistoryEntry> {
        let entry = self.entries.pop()?;
        let removed = self.entries.len();
        if self.cursor == Some(removed) {
            self.engine.undo_last();
            self.cursor = removed.checked_sub(1);
        }
        Some(entry)
    }

    /// Step the cursor one entry forward, replaying that move.
    pub fn forward_move(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        let Some(entry) = self.entries.get(next) else {
            return false;
        };
        match self.engine.apply(entry.mv) {
            Ok(()) => {
                self.cursor = Some(next);
                true
            }
            Err(err) => {
                error!(%err, index = next, "recorded move no longer replays");
                false
            }
        }
    }

    /// Step the cursor one entry back, reverting one ply.
    pub fn backward_move(&mut self) -> bool {
        let Some(current) = self.cursor else {
            return false;
        };
        if !self.engine.undo_last() {
            return false;
        }
        self.cursor = current.checked_sub(1);
        true
    }

    /// Empty history on the standard initial position.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.result = GameResult::Ongoing;
        self.engine.reset();
    }

    /// Start a fresh history from `text`. Invalid text changes nothing.
    pub fn set_from_position(&mut self, text: &str) -> Result<(), GameError> {
        self.engine.import_position(text)?;
        self.entries.clear();
        self.cursor = None;
        self.result = GameResult::Ongoing;
        info!(fen = text, "history reset to imported position");
        Ok(())
    }

    /// Terminal classification of the live position, independent of the cursor.
    pub fn result(&self) -> GameResult {
        self.engine
            .terminal_state()
            .map_or(GameResult::Ongoing, |state| state.result())
    }

    /// Result last recorded by a commit or load.
    pub fn recorded_result(&self) -> GameResult {
        self.result
    }

    pub fn record_result(&mut self, result: GameResult) {
        self.result = result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Square;

    fn mv(text: &str) -> Move {
        Move::new(text[0..2].parse().unwrap(), text[2..4].parse().unwrap())
    }

    fn store_with(moves: &[&str]) -> HistoryStore {
        let mut store: HistoryStore = HistoryStore::default();
        for m in moves {
            store.add_move(mv(m)).unwrap();
        }
        store
    }

    fn fen(store: &HistoryStore) -> String {
        store.engine().fen()
    }

    /// First legal move for the side to move, scanning squares a1..h8.
    fn any_legal_move(store: &HistoryStore) -> Option<Move> {
        (0..64u8).filter_map(Square::from_index).find_map(|from| {
            store
                .engine()
                .legal_destinations(from)
                .first()
                .map(|&to| Move::new(from, to))
        })
    }

    fn assert_cursor_in_range(store: &HistoryStore) {
        if let Some(c) = store.cursor() {
            assert!(c < store.len(), "cursor {} beyond {} entries", c, store.len());
        }
    }

    #[test]
    fn test_add_move_records_position_before() {
        let store = store_with(&["e2e4", "e7e5"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.cursor(), Some(1));
        assert!(store.entries()[0].position_before().is_standard_start());
        assert_eq!(
            store.entries()[1].position_before().as_str(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_illegal_move_is_rejected_without_change() {
        let mut store = store_with(&["e2e4"]);
        let before = fen(&store);
        assert!(store.add_move(mv("e4e6")).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.cursor(), Some(0));
        assert_eq!(fen(&store), before);
    }

    #[test]
    fn test_branch_overwrite() {
        let mut store = store_with(&["e2e4", "e7e5", "g1f3", "b8c6"]);
        assert!(store.backward_move());
        assert!(store.backward_move());
        assert_eq!(store.cursor(), Some(1));

        store.add_move(mv("f1c4")).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.cursor(), Some(2));
        assert_eq!(store.last_entry().unwrap().mv(), mv("f1c4"));
        assert!(!store.forward_move(), "discarded branch must be gone");
    }

    #[test]
    fn test_backward_then_forward_restores_position() {
        let mut store = store_with(&["e2e4", "e7e5", "g1f3"]);
        let before = fen(&store);
        let cursor = store.cursor();
        assert!(store.backward_move());
        assert_ne!(fen(&store), before);
        assert!(store.forward_move());
        assert_eq!(fen(&store), before);
        assert_eq!(store.cursor(), cursor);
    }

    #[test]
    fn test_backward_at_start_is_noop() {
        let mut store: HistoryStore = HistoryStore::default();
        let before = fen(&store);
        assert!(!store.backward_move());
        assert_eq!(store.cursor(), None);
        assert_eq!(fen(&store), before);

        let mut store = store_with(&["e2e4"]);
        assert!(store.backward_move());
        assert!(!store.backward_move());
        assert_eq!(store.cursor(), None);
        assert!(store.engine().export_position().is_standard_start());
    }

    #[test]
    fn test_forward_at_tip_is_noop() {
        let mut store = store_with(&["e2e4"]);
        assert!(!store.forward_move());
        assert_eq!(store.cursor(), Some(0));
    }

    #[test]
    fn test_pop_move_at_tip_reverts_position() {
        let mut store = store_with(&["e2e4", "e7e5"]);
        let popped = store.pop_move().unwrap();
        assert_eq!(popped.mv(), mv("e7e5"));
        assert_eq!(store.cursor(), Some(0));
        assert_eq!(fen(&store), popped.position_before().as_str());
        store.pop_move().unwrap();
        assert_eq!(store.cursor(), None);
        assert!(store.pop_move().is_none());
    }

    #[test]
    fn test_pop_move_behind_tip_keeps_live_position() {
        let mut store = store_with(&["e2e4", "e7e5", "g1f3"]);
        store.backward_move();
        store.backward_move();
        let viewing = fen(&store);
        store.pop_move().unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.cursor(), Some(0));
        assert_eq!(fen(&store), viewing);
        assert!(store.forward_move());
        assert!(!store.forward_move());
    }

    #[test]
    fn test_clear_and_set_from_position() {
        let mut store = store_with(&["e2e4", "e7e5"]);
        store.record_result(GameResult::Draw);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.cursor(), None);
        assert_eq!(store.recorded_result(), GameResult::Ongoing);
        assert!(store.engine().export_position().is_standard_start());

        let mut store = store_with(&["e2e4"]);
        let fen_text = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
        store.set_from_position(fen_text).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.cursor(), None);
        assert_eq!(fen(&store), fen_text);
        assert!(!store.backward_move(), "previous game must be unreachable");
    }

    #[test]
    fn test_invalid_position_leaves_history() {
        let mut store = store_with(&["e2e4", "e7e5"]);
        let before = fen(&store);
        assert!(store.set_from_position("invalid fen string").is_err());
        assert_eq!(store.len(), 2);
        assert_eq!(store.cursor(), Some(1));
        assert_eq!(fen(&store), before);
    }

    #[test]
    fn test_result_follows_live_position_only() {
        let mut store = store_with(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(store.result(), GameResult::BlackWins);
        store.backward_move();
        assert_eq!(store.result(), GameResult::Ongoing);
    }

    #[test]
    fn test_cursor_stays_in_range_under_mixed_operations() {
        let mut store: HistoryStore = HistoryStore::default();
        // Deterministic mix of the four mutating operations.
        let schedule = "aaafbbaafpbbbbfffapaabfbpppbfaaaafbbb";
        for (step, op) in schedule.chars().enumerate() {
            match op {
                'a' => {
                    if let Some(m) = any_legal_move(&store) {
                        store.add_move(m).unwrap();
                    }
                }
                'p' => {
                    store.pop_move();
                }
                'f' => {
                    store.forward_move();
                }
                'b' => {
                    store.backward_move();
                }
                _ => unreachable!(),
            }
            assert_cursor_in_range(&store);

            // Replaying entries[..=cursor] from the start reproduces the live position.
            let mut replay = HistoryStore::new(ShakmatyEngine::new());
            let upto = store.cursor().map_or(0, |c| c + 1);
            for entry in &store.entries()[..upto] {
                replay.add_move(entry.mv()).unwrap();
            }
            assert_eq!(fen(&replay), fen(&store), "step {}", step);
        }
    }
}

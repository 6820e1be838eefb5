//! Two-column move list derived from the history.
//!
//! Rows are keyed by fullmove number and hold an optional white and black
//! move. Each entry's row and column come from its `position_before` marker
//! alone, so the whole list is rebuilt from scratch after every mutation.

use std::collections::BTreeMap;

use tracing::warn;

use crate::history::HistoryEntry;
use crate::rules::RulesEngine;
use crate::types::Side;

/// Placeholder shown for a move not yet played.
pub const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRow {
    pub number: u32,
    pub white: Option<String>,
    pub black: Option<String>,
}

impl MoveRow {
    pub fn white_label(&self) -> &str {
        self.white.as_deref().unwrap_or(EMPTY_CELL)
    }

    pub fn black_label(&self) -> &str {
        self.black.as_deref().unwrap_or(EMPTY_CELL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveColumn {
    White,
    Black,
}

impl From<Side> for MoveColumn {
    fn from(side: Side) -> Self {
        match side {
            Side::White => MoveColumn::White,
            Side::Black => MoveColumn::Black,
        }
    }
}

/// Where a history entry sits in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCell {
    pub row: usize,
    pub column: MoveColumn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveListProjection {
    rows: Vec<MoveRow>,
    // One cell per history entry, same order.
    cells: Vec<MoveCell>,
}

impl MoveListProjection {
    pub fn compute<E: RulesEngine>(entries: &[HistoryEntry], engine: &E) -> Self {
        let Some(first) = entries.first() else {
            return Self::default();
        };
        let first_number = first.position_before().fullmove_number();

        let mut rows: BTreeMap<u32, MoveRow> = BTreeMap::new();
        let mut cells = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let marker = entry.position_before();
            let number = marker.fullmove_number();
            let notation = engine.to_notation(marker, entry.mv()).unwrap_or_else(|err| {
                warn!(index, %err, "falling back to UCI text in move list");
                entry.mv().to_string()
            });

            let row = rows.entry(number).or_insert_with(|| MoveRow {
                number,
                white: None,
                black: None,
            });
            match marker.side_to_move() {
                Side::White => row.white = Some(notation),
                Side::Black => row.black = Some(notation),
            }

            cells.push(MoveCell {
                row: number.saturating_sub(first_number) as usize,
                column: marker.side_to_move().into(),
            });
        }

        MoveListProjection {
            rows: rows.into_values().collect(),
            cells,
        }
    }

    pub fn rows(&self) -> &[MoveRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row holding fullmove `number`, if any move of it was played.
    pub fn row(&self, number: u32) -> Option<&MoveRow> {
        self.rows.iter().find(|row| row.number == number)
    }

    /// Cell of history entry `index`.
    pub fn cell_for(&self, index: usize) -> Option<MoveCell> {
        self.cells.get(index).copied()
    }
}

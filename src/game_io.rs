//! Saving and loading games as PGN records.
//!
//! Records are read with `pgn-reader`, keeping the mainline only. A record
//! is resolved move by move against its own replayed position before any
//! history is touched, so a bad file never leaves a half-loaded game behind.

use std::fmt::Write as _;
use std::io::Cursor;
use std::ops::ControlFlow;
use std::path::Path;

use chrono::{Local, NaiveDate};
use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::san::San;
use shakmaty::Position;
use tracing::{info, warn};

use crate::config::RecordTags;
use crate::error::GameError;
use crate::history::HistoryStore;
use crate::position_marker::parse_position;
use crate::rules::{move_of, RulesEngine};
use crate::types::{GameResult, Move, Side};

/// Movetext line width used when writing records.
const LINE_WIDTH: usize = 80;

/// Tags and mainline SAN of one parsed game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRecord {
    tags: Vec<(String, String)>,
    moves: Vec<San>,
}

impl GameRecord {
    /// Value of tag `name`, compared case-insensitively.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Mainline moves in SAN, in play order.
    pub fn san_moves(&self) -> &[San] {
        &self.moves
    }

    pub fn start_fen(&self) -> Option<&str> {
        self.tag("FEN")
    }

    pub fn result(&self) -> GameResult {
        self.tag("Result").map_or(GameResult::Ongoing, GameResult::from_tag)
    }

    /// Resolve every SAN move against the position it is played from.
    pub fn resolve(&self) -> Result<Vec<Move>, GameError> {
        let mut pos = match self.start_fen() {
            Some(fen) => parse_position(fen)
                .map_err(|e| GameError::InvalidRecord(format!("bad FEN tag: {}", e)))?,
            None => shakmaty::Chess::default(),
        };

        let mut moves = Vec::with_capacity(self.moves.len());
        for (ply, san) in self.moves.iter().enumerate() {
            let m = san.to_move(&pos).map_err(|e| {
                GameError::InvalidRecord(format!("ply {}: illegal move: {} {}", ply + 1, e, san))
            })?;
            let mv = move_of(m).ok_or_else(|| {
                GameError::InvalidRecord(format!("ply {}: unsupported move {}", ply + 1, san))
            })?;
            pos.play_unchecked(m);
            moves.push(mv);
        }
        Ok(moves)
    }

    /// Replace `history` with this game. Nothing changes if the record does
    /// not resolve.
    pub fn apply_to<E: RulesEngine>(&self, history: &mut HistoryStore<E>) -> Result<(), GameError> {
        let moves = self.resolve()?;
        match self.start_fen() {
            Some(fen) => history.set_from_position(fen)?,
            None => history.clear(),
        }
        for mv in moves {
            history.add_move(mv)?;
        }
        history.record_result(self.result());
        Ok(())
    }
}

/// Collects the first game's tags and mainline SAN.
struct RecordVisitor;

impl Visitor for RecordVisitor {
    type Tags = Vec<(String, String)>;
    type Movetext = GameRecord;
    type Output = GameRecord;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::with_capacity(10))
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let key_str = String::from_utf8_lossy(key).into_owned();
        let value_str = String::from_utf8_lossy(value.as_bytes()).into_owned();
        tags.push((key_str, value_str));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(GameRecord {
            tags,
            moves: Vec::new(),
        })
    }

    fn san(
        &mut self,
        movetext: &mut Self::Movetext,
        san_plus: SanPlus,
    ) -> ControlFlow<Self::Output> {
        movetext.moves.push(san_plus.san);
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true)) // mainline only
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext
    }
}

/// Parse the first game in `pgn`.
pub fn parse_record(pgn: &str) -> Result<GameRecord, GameError> {
    let mut reader = Reader::new(Cursor::new(pgn));
    match reader.read_game(&mut RecordVisitor) {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(GameError::InvalidRecord("no game found".to_string())),
        Err(err) => Err(GameError::InvalidRecord(format!("parsing error: {}", err))),
    }
}

/// Render the whole history as a PGN record dated `date`.
pub fn write_record<E: RulesEngine>(
    history: &HistoryStore<E>,
    tags: &RecordTags,
    date: NaiveDate,
) -> Result<String, GameError> {
    let result = match history.recorded_result() {
        GameResult::Ongoing if history.is_at_tip() => history.result(),
        recorded => recorded,
    };
    let start = history.start_position();

    let date_text = date.format("%Y.%m.%d").to_string();

    let mut out = String::new();
    let roster = [
        ("Event", tags.event.as_str()),
        ("Site", tags.site.as_str()),
        ("Date", date_text.as_str()),
        ("Round", tags.round.as_str()),
        ("White", tags.white.as_str()),
        ("Black", tags.black.as_str()),
        ("Result", result.as_tag()),
    ];
    for (key, value) in roster {
        let _ = writeln!(out, "[{} \"{}\"]", key, escape_tag(value));
    }
    if !start.is_standard_start() {
        let _ = writeln!(out, "[SetUp \"1\"]");
        let _ = writeln!(out, "[FEN \"{}\"]", start);
    }
    out.push('\n');

    let mut tokens = Vec::with_capacity(history.len() * 3 / 2 + 1);
    for (index, entry) in history.entries().iter().enumerate() {
        let marker = entry.position_before();
        match marker.side_to_move() {
            Side::White => tokens.push(format!("{}.", marker.fullmove_number())),
            Side::Black if index == 0 => tokens.push(format!("{}...", marker.fullmove_number())),
            Side::Black => {}
        }
        tokens.push(history.engine().to_notation(marker, entry.mv())?);
    }
    tokens.push(result.as_tag().to_string());

    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > LINE_WIDTH {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        line_len += token.len();
        out.push_str(&token);
    }
    out.push('\n');
    Ok(out)
}

/// Write the history to `path`, dated today.
pub fn save_record<E: RulesEngine>(
    path: &Path,
    history: &HistoryStore<E>,
    tags: &RecordTags,
) -> Result<(), GameError> {
    let text = write_record(history, tags, Local::now().date_naive())?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), moves = history.len(), "game saved");
    Ok(())
}

/// Load the first game in `path` into `history`.
pub fn load_record<E: RulesEngine>(
    path: &Path,
    history: &mut HistoryStore<E>,
) -> Result<GameRecord, GameError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "game record not found");
            return Err(GameError::NotFound(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    let record = parse_record(&text)?;
    record.apply_to(history)?;
    info!(path = %path.display(), moves = history.len(), "game loaded");
    Ok(record)
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ShakmatyEngine;

    fn mv(text: &str) -> Move {
        let m = Move::new(text[0..2].parse().unwrap(), text[2..4].parse().unwrap());
        match text.get(4..5) {
            Some("q") => m.with_promotion(crate::types::PieceKind::Queen),
            _ => m,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("chess_history_viewer_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_write_standard_game() {
        let mut history: HistoryStore = HistoryStore::default();
        for m in ["e2e4", "e7e5", "g1f3"] {
            history.add_move(mv(m)).unwrap();
        }
        let pgn = write_record(&history, &RecordTags::default(), date()).unwrap();

        assert!(pgn.starts_with("[Event \"Casual Game\"]\n"));
        assert!(pgn.contains("[Date \"2024.03.09\"]\n"));
        assert!(pgn.contains("[Result \"*\"]\n"));
        assert!(!pgn.contains("[FEN"));
        assert!(pgn.ends_with("\n\n1. e4 e5 2. Nf3 *\n"));
    }

    #[test]
    fn test_write_black_first_from_fen() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3";
        let mut history = HistoryStore::new(ShakmatyEngine::from_fen(fen).unwrap());
        history.add_move(mv("a7a6")).unwrap();
        history.add_move(mv("b5a4")).unwrap();

        let pgn = write_record(&history, &RecordTags::default(), date()).unwrap();
        assert!(pgn.contains("[SetUp \"1\"]\n"));
        assert!(pgn.contains(&format!("[FEN \"{}\"]\n", fen)));
        assert!(pgn.contains("3... a6 4. Ba4 *"));
    }

    #[test]
    fn test_write_records_checkmate_result() {
        let mut history: HistoryStore = HistoryStore::default();
        for m in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            history.add_move(mv(m)).unwrap();
        }
        let pgn = write_record(&history, &RecordTags::default(), date()).unwrap();
        assert!(pgn.contains("[Result \"0-1\"]"));
        assert!(pgn.contains("2. g4 Qh4# 0-1"));
    }

    #[test]
    fn test_write_whole_history_behind_cursor() {
        let mut history: HistoryStore = HistoryStore::default();
        for m in ["d2d4", "d7d5"] {
            history.add_move(mv(m)).unwrap();
        }
        history.backward_move();
        history.backward_move();
        let pgn = write_record(&history, &RecordTags::default(), date()).unwrap();
        assert!(pgn.contains("1. d4 d5 *"));
    }

    #[test]
    fn test_parse_record_mainline_only() {
        let pgn = r#"[Event "Test"]
[Result "1-0"]

1. e4 e5 (1... c5 2. Nf3) 2. Nf3 {a comment} Nc6 1-0
"#;
        let record = parse_record(pgn).unwrap();
        assert_eq!(record.tag("event"), Some("Test"));
        let sans: Vec<String> = record.san_moves().iter().map(San::to_string).collect();
        assert_eq!(sans, ["e4", "e5", "Nf3", "Nc6"]);
        assert_eq!(record.result(), GameResult::WhiteWins);
        assert_eq!(record.resolve().unwrap().len(), 4);
    }

    #[test]
    fn test_resolve_castling_and_promotion() {
        let pgn = "[FEN \"r3k2r/P7/8/8/8/8/8/R3K2R w KQkq - 0 1\"]\n\n1. O-O O-O-O 2. a8=Q+ *\n";
        let record = parse_record(pgn).unwrap();
        let moves = record.resolve().unwrap();
        assert_eq!(moves[0], mv("e1g1"));
        assert_eq!(moves[1], mv("e8c8"));
        assert_eq!(moves[2], mv("a7a8q"));
    }

    #[test]
    fn test_illegal_record_leaves_history_untouched() {
        let mut history: HistoryStore = HistoryStore::default();
        history.add_move(mv("e2e4")).unwrap();
        let before = history.engine().fen();

        let record = parse_record("1. e4 e5 2. Ke3 *\n").unwrap();
        assert!(matches!(
            record.apply_to(&mut history),
            Err(GameError::InvalidRecord(_))
        ));
        assert_eq!(history.len(), 1);
        assert_eq!(history.engine().fen(), before);
    }

    #[test]
    fn test_illegal_move_error_names_the_move() {
        let record = parse_record("1. e4 e5 2. Ke3 *\n").unwrap();
        assert_eq!(record.san_moves()[2], "Ke3".parse::<San>().unwrap());
        match record.resolve() {
            Err(GameError::InvalidRecord(msg)) => {
                assert!(msg.starts_with("ply 3: illegal move"), "{}", msg);
                assert!(msg.ends_with("Ke3"), "{}", msg);
            }
            other => panic!("expected invalid record, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_fen_tag_is_invalid_record() {
        let record = parse_record("[FEN \"garbage\"]\n\n1. e4 *\n").unwrap();
        assert!(matches!(record.resolve(), Err(GameError::InvalidRecord(_))));
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save_then_load.pgn");
        let mut history: HistoryStore = HistoryStore::default();
        for m in ["e2e4", "c7c5", "g1f3", "d7d6"] {
            history.add_move(mv(m)).unwrap();
        }
        save_record(&path, &history, &RecordTags::default()).unwrap();

        let mut loaded: HistoryStore = HistoryStore::default();
        load_record(&path, &mut loaded).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.cursor(), Some(3));
        assert_eq!(loaded.engine().fen(), history.engine().fen());
        for (a, b) in loaded.entries().iter().zip(history.entries()) {
            assert_eq!(a.mv(), b.mv());
            assert_eq!(a.position_before(), b.position_before());
        }
    }

    #[test]
    fn test_load_from_setup_position() {
        let path = temp_path("setup.pgn");
        let fen = "8/P6k/8/8/8/8/8/K7 w - - 0 1";
        let mut history = HistoryStore::new(ShakmatyEngine::from_fen(fen).unwrap());
        history.add_move(mv("a7a8q")).unwrap();
        save_record(&path, &history, &RecordTags::default()).unwrap();

        let mut loaded: HistoryStore = HistoryStore::default();
        load_record(&path, &mut loaded).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.start_position().as_str(), fen);
        assert_eq!(loaded.entries()[0].mv(), mv("a7a8q"));
    }

    #[test]
    fn test_load_missing_file() {
        let mut history: HistoryStore = HistoryStore::default();
        history.add_move(mv("e2e4")).unwrap();
        let path = temp_path("does_not_exist.pgn");
        assert!(matches!(
            load_record(&path, &mut history),
            Err(GameError::NotFound(_))
        ));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_escape_tag() {
        assert_eq!(escape_tag(r#"a "b" \c"#), r#"a \"b\" \\c"#);
    }
}

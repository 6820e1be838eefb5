//! Line-oriented terminal driver for a game session.
//!
//! Usage: `chess_viewer [FEN]`, then one command per line (`help` lists them).
//! Logs go to stderr; set `RUST_LOG=debug` for more.

use std::io::{self, BufRead, Write};

use chess_history_viewer::{
    parse_command, Command, GameSession, PieceKind, RulesEngine, SessionConfig, Side, Square,
    StateChange,
};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  up | down | left | right     move the hover cursor
  enter | select               confirm the hovered square
  q | deselect                 drop the selection
  hover <sq> | click <sq>      pointer hover / click, e.g. click e2
  promote <q|r|b|n>            finish a pending promotion
  cancel                       cancel a pending promotion
  forward | back | undo        walk or trim the history
  new | fen <text>             new game / set up a position
  save <path> | load <path>    PGN records
  show | quit";

fn piece_char(kind: PieceKind, side: Side) -> char {
    match side {
        Side::White => kind.letter().to_ascii_uppercase(),
        Side::Black => kind.letter(),
    }
}

fn render(session: &GameSession) -> String {
    let selection = session.selection();
    let mut out = String::new();
    for rank in (0..8).rev() {
        out.push_str(&format!("{} ", rank + 1));
        for file in 0..8 {
            let Some(square) = Square::from_coords(file, rank) else {
                continue;
            };
            let piece = session
                .engine()
                .piece_at(square)
                .map_or('.', |p| piece_char(p.kind, p.side));
            let (open, close) = if selection.selected() == Some(square) {
                ('<', '>')
            } else if selection.hovered() == square {
                ('[', ']')
            } else if selection.candidate_targets().contains(&square) {
                ('*', ' ')
            } else {
                (' ', ' ')
            };
            out.push(open);
            out.push(piece);
            out.push(close);
        }
        out.push('\n');
    }
    out.push_str("   a  b  c  d  e  f  g  h\n");

    out.push('\n');
    let highlighted = session.highlighted_cell();
    for (row_index, row) in session.projection().rows().iter().enumerate() {
        let mark = match highlighted {
            Some(cell) if cell.row == row_index => "> ",
            _ => "  ",
        };
        out.push_str(&format!(
            "{}{:>3}. {:<8} {}\n",
            mark,
            row.number,
            row.white_label(),
            row.black_label()
        ));
    }

    out.push_str(&session.turn_label());
    if !session.terminal_label().is_empty() {
        out.push_str(" | ");
        out.push_str(session.terminal_label());
    }
    if let Some(pending) = selection.pending_promotion() {
        out.push_str(&format!(
            " | promote {}{}: q, r, b or n?",
            pending.from(),
            pending.to()
        ));
    }
    if !session.status_message().is_empty() {
        out.push_str(" | ");
        out.push_str(session.status_message());
    }
    out.push('\n');
    out
}

fn send(msg: &str) {
    println!("{}", msg);
    io::stdout().flush().ok();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = SessionConfig::from_args(std::env::args().skip(1));
    let mut session = GameSession::new(config);
    send(&render(&session));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(input) = line else {
            break;
        };
        if input.trim().eq_ignore_ascii_case("help") {
            send(HELP);
            continue;
        }
        let command = match parse_command(&input) {
            Ok(command) => command,
            Err(err) => {
                send(&format!("{} (try 'help')", err));
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        let show = command == Command::Show;
        let saving = matches!(command, Command::Save(_));
        match session.execute(command) {
            Ok(_) if saving => send(session.status_message()),
            Ok(StateChange::None) if !show => {}
            Ok(_) => send(&render(&session)),
            Err(_) => send(session.status_message()),
        }
    }
}

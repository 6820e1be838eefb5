//! Line-oriented text commands driving a session.

use std::path::PathBuf;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while_m_n},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::{all_consuming, eof, map, map_res, peek, value, verify},
    sequence::{delimited, preceded, terminated},
    IResult, Parser,
};

use crate::error::GameError;
use crate::selection::InputEvent;
use crate::types::{Direction, PieceKind, Square};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(InputEvent),
    Forward,
    Back,
    Undo,
    New,
    Fen(String),
    Save(PathBuf),
    Load(PathBuf),
    Show,
    Quit,
}

impl FromStr for Command {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_command(s)
    }
}

/// Parse one command line. Keywords are case-insensitive.
pub fn parse_command(line: &str) -> Result<Command, GameError> {
    match all_consuming(delimited(multispace0, command, multispace0)).parse(line) {
        Ok((_, cmd)) => Ok(cmd),
        Err(_) => Err(GameError::InvalidCommand(line.trim().to_string())),
    }
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((with_argument, board_input, navigation)).parse(input)
}

/// A keyword followed by whitespace or end of input.
fn keyword<'a>(
    name: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag_no_case(name), peek(alt((multispace1, eof))))
}

fn board_input(input: &str) -> IResult<&str, Command> {
    map(
        alt((
            value(InputEvent::Hover(Direction::Up), keyword("up")),
            value(InputEvent::Hover(Direction::Down), keyword("down")),
            value(InputEvent::Hover(Direction::Left), keyword("left")),
            value(InputEvent::Hover(Direction::Right), keyword("right")),
            value(InputEvent::Confirm, alt((keyword("enter"), keyword("select")))),
            value(InputEvent::Deselect, alt((keyword("q"), keyword("deselect")))),
            value(InputEvent::CancelPromotion, keyword("cancel")),
            map(preceded((keyword("hover"), multispace1), square), InputEvent::HoverAt),
            map(preceded((keyword("click"), multispace1), square), InputEvent::ConfirmAt),
            map(
                preceded((keyword("promote"), multispace1), piece_kind),
                InputEvent::Promote,
            ),
        )),
        Command::Input,
    )
    .parse(input)
}

fn navigation(input: &str) -> IResult<&str, Command> {
    alt((
        value(Command::Forward, keyword("forward")),
        value(Command::Back, alt((keyword("back"), keyword("backward")))),
        value(Command::Undo, keyword("undo")),
        value(Command::New, keyword("new")),
        value(Command::Show, keyword("show")),
        value(Command::Quit, alt((keyword("quit"), keyword("exit")))),
    ))
    .parse(input)
}

fn with_argument(input: &str) -> IResult<&str, Command> {
    alt((
        map(preceded((keyword("fen"), multispace1), rest_of_line), Command::Fen),
        map(preceded((keyword("save"), multispace1), rest_of_line), |p| {
            Command::Save(PathBuf::from(p))
        }),
        map(preceded((keyword("load"), multispace1), rest_of_line), |p| {
            Command::Load(PathBuf::from(p))
        }),
    ))
    .parse(input)
}

fn square(input: &str) -> IResult<&str, Square> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_alphanumeric()),
        |s: &str| s.to_ascii_lowercase().parse::<Square>(),
    )
    .parse(input)
}

fn piece_kind(input: &str) -> IResult<&str, PieceKind> {
    alt((
        value(PieceKind::Queen, alt((keyword("queen"), keyword("q")))),
        value(PieceKind::Rook, alt((keyword("rook"), keyword("r")))),
        value(PieceKind::Bishop, alt((keyword("bishop"), keyword("b")))),
        value(PieceKind::Knight, alt((keyword("knight"), keyword("n")))),
        value(PieceKind::King, alt((keyword("king"), keyword("k")))),
        value(PieceKind::Pawn, alt((keyword("pawn"), keyword("p")))),
    ))
    .parse(input)
}

/// Non-empty remainder of the line, trimmed.
fn rest_of_line(input: &str) -> IResult<&str, String> {
    map(
        verify(not_line_ending, |s: &str| !s.trim().is_empty()),
        |s: &str| s.trim().to_string(),
    )
    .parse(input)
}

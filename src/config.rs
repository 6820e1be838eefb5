//! Session configuration.

/// Tags written into every saved game record, besides Date and Result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTags {
    pub event: String,
    pub site: String,
    pub round: String,
    pub white: String,
    pub black: String,
}

impl Default for RecordTags {
    fn default() -> Self {
        RecordTags {
            event: "Casual Game".to_string(),
            site: "Local".to_string(),
            round: "1".to_string(),
            white: "Player 1".to_string(),
            black: "Player 2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Starting position as FEN; `None` means the standard initial position.
    pub start_fen: Option<String>,
    pub tags: RecordTags,
}

impl SessionConfig {
    /// Build from process arguments (program name excluded). The first
    /// positional argument, if any, is the starting FEN.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let start_fen = args
            .into_iter()
            .map(Into::<String>::into)
            .find(|arg| !arg.starts_with('-'))
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty());
        SessionConfig {
            start_fen,
            ..Self::default()
        }
    }

    pub fn with_start_fen(mut self, fen: impl Into<String>) -> Self {
        self.start_fen = Some(fen.into());
        self
    }
}

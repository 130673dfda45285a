use std::fmt;
use std::str::FromStr;

use lib_feedsync::core::ScrollPosition;

/// Height of one rendered record in the simulated viewport.
const ROW_HEIGHT: f64 = 80.0;
/// Records visible at once.
const VISIBLE_ROWS: f64 = 8.0;

/// One line typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scroll to the end of the list.
    End,
    /// Scroll back to the top.
    Top,
    /// Publish a tweet.
    Post(String),
    /// Look a user up.
    Search(String),
    /// Log the sync state.
    Status,
    /// Synchronize now.
    Refresh,
    /// Clear the error notice.
    Dismiss,
    /// Stop the watcher.
    Quit,
    Help,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match (word.to_ascii_lowercase().as_str(), rest.is_empty()) {
            ("end" | "e" | "more", true) => Ok(Command::End),
            ("top" | "t", true) => Ok(Command::Top),
            ("status" | "s", true) => Ok(Command::Status),
            ("refresh" | "r", true) => Ok(Command::Refresh),
            ("dismiss" | "d", true) => Ok(Command::Dismiss),
            ("quit" | "q" | "exit", true) => Ok(Command::Quit),
            ("help" | "h" | "?", true) => Ok(Command::Help),
            ("post" | "p", false) => Ok(Command::Post(rest.to_string())),
            ("search" | "find", false) => Ok(Command::Search(rest.to_string())),
            ("post" | "p" | "search" | "find", true) => Err(format!("{word} needs an argument")),
            _ => Err(format!("unknown command {line:?}; try help")),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::End => f.write_str("end"),
            Command::Top => f.write_str("top"),
            Command::Post(text) => write!(f, "post {text}"),
            Command::Search(name) => write!(f, "search {name}"),
            Command::Status => f.write_str("status"),
            Command::Refresh => f.write_str("refresh"),
            Command::Dismiss => f.write_str("dismiss"),
            Command::Quit => f.write_str("quit"),
            Command::Help => f.write_str("help"),
        }
    }
}

pub const HELP: &str = "commands: end | top | refresh | post <text> | search <user> | status | dismiss | quit";

/// Scroll position for a list of `rows` records, at the top or at the end.
pub fn simulated_scroll(rows: usize, at_end: bool) -> ScrollPosition {
    let viewport = ROW_HEIGHT * VISIBLE_ROWS;
    let content_height = (rows as f64 * ROW_HEIGHT).max(viewport);
    if at_end {
        ScrollPosition::at_end(viewport, content_height)
    } else {
        ScrollPosition { offset: 0.0, viewport, content_height }
    }
}

//! The textual command language carried in replicated bodies.
//!
//! ```text
//! NODE   <id>                    create or revive a node
//! DROP   <id>                    remove a node
//! SET    <id> <key> <value...>   set a node attribute
//! UNSET  <id> <key>              remove a node attribute
//! LINK   <id> <from> <to>        connect two nodes
//! UNLINK <id>                    remove a link
//! READ   <id>                    print one object (query)
//! OBJECTS                        print every object (query)
//! ```
//!
//! Keywords are case-insensitive. A replicated body prefixes the command with
//! the timestamp it was applied at: `"<timestamp> <command>"`.

use std::fmt;
use std::str::FromStr;
use tandem_crdt::Timestamp;
use thiserror::Error;

/// Errors produced while parsing commands and mutation bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{keyword}: missing {what}")]
    MissingArgument {
        keyword: &'static str,
        what: &'static str,
    },

    #[error("{keyword}: unexpected argument {arg:?}")]
    UnexpectedArgument { keyword: &'static str, arg: String },

    #[error("missing timestamp")]
    MissingTimestamp,

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("{0} is a query and is never replicated")]
    NotReplicable(&'static str),
}

/// One parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Node { id: String },
    Drop { id: String },
    Set { id: String, key: String, value: String },
    Unset { id: String, key: String },
    Link { id: String, from: String, to: String },
    Unlink { id: String },
    Read { id: String },
    Objects,
}

impl Command {
    /// Every keyword the parser accepts.
    pub const KEYWORDS: [&'static str; 8] = [
        "NODE", "DROP", "SET", "UNSET", "LINK", "UNLINK", "READ", "OBJECTS",
    ];

    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Node { .. } => "NODE",
            Self::Drop { .. } => "DROP",
            Self::Set { .. } => "SET",
            Self::Unset { .. } => "UNSET",
            Self::Link { .. } => "LINK",
            Self::Unlink { .. } => "UNLINK",
            Self::Read { .. } => "READ",
            Self::Objects => "OBJECTS",
        }
    }

    /// Returns `true` for commands that only render state.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Objects)
    }
}

/// Splits off the next whitespace-delimited token.
fn next_token(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], &input[end..])),
        None => Some((input, "")),
    }
}

struct Args<'a> {
    keyword: &'static str,
    rest: &'a str,
}

impl Args<'_> {
    fn required(&mut self, what: &'static str) -> Result<String, CommandError> {
        let (token, rest) = next_token(self.rest).ok_or(CommandError::MissingArgument {
            keyword: self.keyword,
            what,
        })?;
        self.rest = rest;
        Ok(token.to_owned())
    }

    /// Everything left on the line, which must not be empty.
    fn remainder(&mut self, what: &'static str) -> Result<String, CommandError> {
        let rest = self.rest.trim();
        if rest.is_empty() {
            return Err(CommandError::MissingArgument {
                keyword: self.keyword,
                what,
            });
        }
        self.rest = "";
        Ok(rest.to_owned())
    }

    fn finish(self) -> Result<(), CommandError> {
        match next_token(self.rest) {
            Some((arg, _)) => Err(CommandError::UnexpectedArgument {
                keyword: self.keyword,
                arg: arg.to_owned(),
            }),
            None => Ok(()),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (word, rest) = next_token(input).ok_or(CommandError::Empty)?;
        let upper = word.to_ascii_uppercase();
        let keyword = Self::KEYWORDS
            .iter()
            .copied()
            .find(|k| *k == upper)
            .ok_or_else(|| CommandError::Unknown(word.to_owned()))?;
        let mut args = Args { keyword, rest };

        let command = match keyword {
            "NODE" => Self::Node {
                id: args.required("id")?,
            },
            "DROP" => Self::Drop {
                id: args.required("id")?,
            },
            "SET" => Self::Set {
                id: args.required("id")?,
                key: args.required("key")?,
                value: args.remainder("value")?,
            },
            "UNSET" => Self::Unset {
                id: args.required("id")?,
                key: args.required("key")?,
            },
            "LINK" => Self::Link {
                id: args.required("id")?,
                from: args.required("source node")?,
                to: args.required("target node")?,
            },
            "UNLINK" => Self::Unlink {
                id: args.required("id")?,
            },
            "READ" => Self::Read {
                id: args.required("id")?,
            },
            _ => Self::Objects,
        };
        args.finish()?;
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.keyword();
        match self {
            Self::Node { id } | Self::Drop { id } | Self::Unlink { id } | Self::Read { id } => {
                write!(f, "{keyword} {id}")
            }
            Self::Set { id, key, value } => write!(f, "{keyword} {id} {key} {value}"),
            Self::Unset { id, key } => write!(f, "{keyword} {id} {key}"),
            Self::Link { id, from, to } => write!(f, "{keyword} {id} {from} {to}"),
            Self::Objects => f.write_str(keyword),
        }
    }
}

/// A command stamped with the timestamp it was applied at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub at: Timestamp,
    pub command: Command,
}

impl Mutation {
    #[must_use]
    pub fn new(at: Timestamp, command: Command) -> Self {
        Self { at, command }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at, self.command)
    }
}

impl FromStr for Mutation {
    type Err = CommandError;

    fn from_str(body: &str) -> Result<Self, Self::Err> {
        let (stamp, rest) = next_token(body).ok_or(CommandError::MissingTimestamp)?;
        let at = stamp
            .parse::<Timestamp>()
            .map_err(|_| CommandError::InvalidTimestamp(stamp.to_owned()))?;
        let command: Command = rest.parse()?;
        if command.is_query() {
            return Err(CommandError::NotReplicable(command.keyword()));
        }
        Ok(Self { at, command })
    }
}

//! Owned IRC messages and client command constructors.

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::parser::ParsedLine;
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// The command is kept as its raw token (`PRIVMSG`, `001`, ...); the client
/// only interprets the handful of commands it needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message origin, if the server attached one.
    pub prefix: Option<Prefix>,
    /// Command name or three-digit numeric, uppercased.
    pub command: String,
    /// Parameters, trailing parameter last.
    pub params: Vec<String>,
}

impl Message {
    /// Build a message from a command and parameters.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    /// `NICK <nick>`
    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", [nick])
    }

    /// `USER <user> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname])
    }

    /// `JOIN <channel>`
    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", [channel])
    }

    /// `PONG :<token>`
    pub fn pong(token: &str) -> Self {
        Self::new("PONG", [token])
    }

    /// `QUIT :<reason>`
    pub fn quit(reason: &str) -> Self {
        Self::new("QUIT", [reason])
    }

    /// Attach a prefix.
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Get a parameter by index.
    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }

    /// Nickname of the sender, if the prefix is a user prefix.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Whether the command is the given three-digit numeric.
    pub fn is_numeric(&self, code: u16) -> bool {
        self.command.len() == 3 && self.command.parse::<u16>().ok() == Some(code)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = ParsedLine::parse(s)?;
        Ok(Self {
            prefix: parsed.prefix.map(Prefix::new_from_str),
            command: parsed.command.to_ascii_uppercase(),
            params: parsed.params.iter().map(|p| (*p).to_string()).collect(),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;

        let Some((last, middle)) = self.params.split_last() else {
            return Ok(());
        };
        for param in middle {
            write!(f, " {param}")?;
        }
        // Trailing marker is required when the last param is empty, contains
        // a space or starts with ':'; always using it for the last of several
        // params keeps PRIVMSG text intact.
        if self.params.len() > 1
            || last.is_empty()
            || last.contains(' ')
            || last.starts_with(':')
        {
            write!(f, " :{last}")
        } else {
            write!(f, " {last}")
        }
    }
}

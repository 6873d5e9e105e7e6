//! Command recognition and the per-line invocation record.

use regex::Regex;
use straybot_proto::{Prefix, irc_eq};

/// The sender of a chat line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserRef {
    pub nickname: String,
    pub username: String,
    pub host: String,
}

impl UserRef {
    pub fn new(
        nickname: impl Into<String>,
        username: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            username: username.into(),
            host: host.into(),
        }
    }

    /// Build from a message prefix. Server prefixes have no user.
    pub fn from_prefix(prefix: &Prefix) -> Option<Self> {
        match prefix {
            Prefix::Nickname(nick, user, host) if !nick.is_empty() => {
                Some(Self::new(nick.as_str(), user.as_str(), host.as_str()))
            }
            _ => None,
        }
    }

    /// `nick!user@host`, as matched against admin patterns.
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nickname, self.username, self.host)
    }
}

/// One recognized command line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command name, case preserved.
    pub command: String,
    /// Everything after the separating whitespace, verbatim. Empty when absent.
    pub args: String,
    pub user: UserRef,
    /// Where replies go: the sender for private messages, else the channel.
    pub reply_target: String,
}

impl Invocation {
    /// Whitespace-separated argument words.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.args.split_whitespace()
    }
}

/// Pick the reply target for a line sent to `destination`.
///
/// A line addressed to the bot's current nickname is a private message and is
/// answered to the sender; anything else is answered where it was said.
pub fn reply_target(destination: &str, current_nick: &str, sender_nick: &str) -> String {
    if irc_eq(destination, current_nick) {
        sender_nick.to_string()
    } else {
        destination.to_string()
    }
}

/// Matches `<prefix><name>[<whitespace><args>]`.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    prefix: String,
    regex: Regex,
}

impl CommandPattern {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(
            r"^{}([a-zA-Z][a-zA-Z0-9]*)(?:\s+(.*))?$",
            regex::escape(prefix)
        ))?;
        Ok(Self {
            prefix: prefix.to_string(),
            regex,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Split a line into `(command, args)`, or `None` if it is not a command.
    pub fn parse<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.regex.captures(line)?;
        let command = caps.get(1)?.as_str();
        let args = caps.get(2).map_or("", |m| m.as_str());
        Some((command, args))
    }
}

/// Whether `name` is a legal command name.
pub fn is_valid_command_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

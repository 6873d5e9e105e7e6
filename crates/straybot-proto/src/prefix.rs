//! IRC message prefix types.
//!
//! A prefix identifies the origin of a message: either a server name or a
//! user's `nick!user@host` mask.

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;

/// IRC message prefix - identifies the origin of a message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g., "irc.example.com")
    ServerName(String),
    /// User prefix: (nickname, username, hostname)
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix string leniently; components are not validated.
    ///
    /// A dot in the name part with no `!`/`@` marks a server name.
    pub fn new_from_str(s: &str) -> Self {
        let (name, rest) = match s.find(['!', '@']) {
            Some(idx) => (&s[..idx], &s[idx..]),
            None => (s, ""),
        };

        if rest.is_empty() {
            return if name.contains('.') {
                Prefix::ServerName(name.to_string())
            } else {
                Prefix::Nickname(name.to_string(), String::new(), String::new())
            };
        }

        let (user, host) = match rest.strip_prefix('!') {
            Some(after_bang) => match after_bang.split_once('@') {
                Some((user, host)) => (user, host),
                None => (after_bang, ""),
            },
            None => ("", rest.trim_start_matches('@')),
        };

        Prefix::Nickname(name.to_string(), user.to_string(), host.to_string())
    }

    /// Create a new user prefix from nick, user, and host components.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// Get the nickname if this is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Get the username if this is a user prefix.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Get the hostname (or the server name for server prefixes).
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl FromStr for Prefix {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.contains(' ') {
            return Err(MessageParseError::InvalidPrefix(s.to_string()));
        }
        Ok(Prefix::new_from_str(s))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

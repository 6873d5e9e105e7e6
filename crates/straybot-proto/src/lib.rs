//! # straybot-proto
//!
//! Client-side IRC line protocol used by the straybot kernel.
//!
//! ## Features
//!
//! - IRC message parsing (prefix, command, parameters) with `nom`
//! - Message serialization and client command constructors
//! - Optional Tokio integration: a line codec yielding parsed [`Message`]s
//! - RFC 1459 case-insensitive hostmask matching
//!
//! ## Quick Start
//!
//! ```rust
//! use straybot_proto::{Message, Prefix};
//!
//! let msg: Message = ":alice!al@host.example PRIVMSG #rust :,about"
//!     .parse()
//!     .expect("valid IRC line");
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.prefix, Some(Prefix::new("alice", "al", "host.example")));
//! assert_eq!(msg.param(1), Some(",about"));
//!
//! let reply = Message::privmsg("#rust", "I'm a bot!");
//! assert_eq!(reply.to_string(), "PRIVMSG #rust :I'm a bot!");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

#[cfg(feature = "tokio")]
pub mod codec;
pub mod error;
pub mod message;
mod parser;
pub mod prefix;
pub mod util;

#[cfg(feature = "tokio")]
pub use self::codec::IrcCodec;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::util::{irc_eq, irc_to_lower, matches_hostmask, wildcard_match};

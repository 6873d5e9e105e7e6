//! Network module.
//!
//! Contains the IRC client connection and the outgoing message sink the
//! kernel speaks through.

mod client;
mod sender;

pub use client::IrcClient;
pub use sender::IrcSender;

use async_trait::async_trait;
use straybot_proto::ProtocolError;
use thiserror::Error;

/// Errors sending to or talking with the chat network.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Outgoing chat capability.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send `text` to a channel or nickname. Multi-line text becomes one
    /// message per non-empty line.
    async fn send(&self, target: &str, text: &str) -> Result<(), TransportError>;
}

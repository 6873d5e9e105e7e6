//! Channel-backed message sink feeding the connection's writer.

use super::{MessageSink, TransportError};
use async_trait::async_trait;
use straybot_proto::Message;
use tokio::sync::mpsc;

/// Queues PRIVMSGs for the connection task.
#[derive(Debug, Clone)]
pub struct IrcSender {
    tx: mpsc::Sender<Message>,
}

impl IrcSender {
    /// Create a sender and the receiver the connection drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a raw message.
    pub async fn send_message(&self, msg: Message) -> Result<(), TransportError> {
        self.tx.send(msg).await.map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl MessageSink for IrcSender {
    async fn send(&self, target: &str, text: &str) -> Result<(), TransportError> {
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            self.send_message(Message::privmsg(target, line)).await?;
        }
        Ok(())
    }
}

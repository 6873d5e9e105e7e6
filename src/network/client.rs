//! IRC client connection.
//!
//! Registers with the server, joins the configured channels, answers PINGs,
//! tracks the nickname the network assigns and hands every PRIVMSG to the
//! kernel on its own task.

use super::TransportError;
use crate::config::EnvironmentConfig;
use crate::kernel::{Kernel, UserRef};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use straybot_proto::{IrcCodec, Message, irc_eq};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, warn};

const RPL_WELCOME: u16 = 1;
const ERR_NICKNAMEINUSE: u16 = 433;

enum SelectResult {
    /// A parsed line from the server.
    Incoming(Message),
    /// A queued message to write.
    Outgoing(Message),
    /// The server closed the connection.
    Closed,
    /// Every sender is gone.
    Shutdown,
}

/// Registration progress.
struct Session {
    registered: bool,
    requested_nick: String,
}

/// One connection to an IRC server.
pub struct IrcClient {
    env: EnvironmentConfig,
    kernel: Arc<Kernel>,
    outgoing: mpsc::Receiver<Message>,
}

impl IrcClient {
    pub fn new(
        env: EnvironmentConfig,
        kernel: Arc<Kernel>,
        outgoing: mpsc::Receiver<Message>,
    ) -> Self {
        Self {
            env,
            kernel,
            outgoing,
        }
    }

    /// Connect to the configured server and run until disconnected.
    pub async fn run(self) -> Result<(), TransportError> {
        let span = crate::telemetry::spans::connection(&self.env.server, &self.env.nickname);
        async move {
            info!("Connecting");
            let stream = TcpStream::connect(&self.env.server).await?;
            info!("Connected to the server: {}", self.env.server);
            self.run_on(stream).await
        }
        .instrument(span)
        .await
    }

    /// Run the session over an established stream.
    pub async fn run_on<S>(mut self, stream: S) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut writer, mut reader) = Framed::new(stream, IrcCodec::new()).split();

        let mut session = Session {
            registered: false,
            requested_nick: self.env.nickname.clone(),
        };
        writer.send(Message::nick(&session.requested_nick)).await?;
        writer
            .send(Message::user(&self.env.username, &self.env.realname))
            .await?;

        loop {
            let event = tokio::select! {
                incoming = reader.next() => match incoming {
                    None => SelectResult::Closed,
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Err(e))) => {
                        warn!(error = %e, "Ignoring unparseable line");
                        continue;
                    }
                    Some(Ok(Ok(msg))) => SelectResult::Incoming(msg),
                },
                outgoing = self.outgoing.recv() => match outgoing {
                    Some(msg) => SelectResult::Outgoing(msg),
                    None => SelectResult::Shutdown,
                },
            };

            match event {
                SelectResult::Incoming(msg) => {
                    for reply in self.on_message(&mut session, msg) {
                        writer.send(reply).await?;
                    }
                }
                SelectResult::Outgoing(msg) => writer.send(msg).await?,
                SelectResult::Closed => {
                    info!("Disconnected from {}", self.env.server);
                    return Ok(());
                }
                SelectResult::Shutdown => {
                    writer.send(Message::quit("Shutting down")).await?;
                    return Ok(());
                }
            }
        }
    }

    /// React to one server line. Returns the lines to write back.
    fn on_message(&self, session: &mut Session, msg: Message) -> Vec<Message> {
        if msg.is_numeric(RPL_WELCOME) {
            session.registered = true;
            if let Some(nick) = msg.param(0) {
                self.kernel.on_renamed(nick);
            }
            info!(nick = %self.kernel.nickname(), "Registered");
            return self.env.channels.iter().map(|c| Message::join(c)).collect();
        }

        if msg.is_numeric(ERR_NICKNAMEINUSE) {
            if session.registered {
                return Vec::new();
            }
            session.requested_nick.push('_');
            warn!(retry = %session.requested_nick, "Nickname in use");
            return vec![Message::nick(&session.requested_nick)];
        }

        let from_self = msg
            .source_nickname()
            .is_some_and(|nick| irc_eq(nick, &self.kernel.nickname()));

        match msg.command.as_str() {
            "PING" => vec![Message::pong(msg.param(0).unwrap_or_default())],
            "NICK" if from_self => {
                if let Some(nick) = msg.param(0) {
                    self.kernel.on_renamed(nick);
                }
                Vec::new()
            }
            "JOIN" if from_self => {
                info!("Joined {}", msg.param(0).unwrap_or_default());
                Vec::new()
            }
            "PRIVMSG" => {
                self.dispatch(msg);
                Vec::new()
            }
            "ERROR" => {
                warn!(reason = msg.param(0).unwrap_or_default(), "Server error");
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn dispatch(&self, msg: Message) {
        let Some(user) = msg.prefix.as_ref().and_then(UserRef::from_prefix) else {
            return;
        };
        let (Some(destination), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        debug!(
            "Received message from {} to {} with content \"{}\"",
            user.nickname, destination, text
        );

        let kernel = Arc::clone(&self.kernel);
        let destination = destination.to_string();
        let text = text.to_string();
        tokio::spawn(async move {
            kernel.handle(&text, user, &destination).await;
        });
    }
}

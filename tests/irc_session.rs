//! A scripted IRC server talking to the client over an in-memory pipe.

mod common;

use common::Harness;
use std::sync::Arc;
use std::time::Duration;
use straybot::config::{Config, EnvironmentConfig};
use straybot::db::Database;
use straybot::handlers;
use straybot::kernel::Kernel;
use straybot::logger::{LogFilter, Logger, MemorySink};
use straybot::network::{IrcClient, IrcSender};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};

fn environment() -> EnvironmentConfig {
    toml::from_str(
        r##"
        server = "irc.example.net:6667"
        nickname = "straybot"
        channels = ["#bots", "#hockey"]
        "##,
    )
    .unwrap()
}

/// The server side of the pipe.
struct Server {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Server {
    fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn expect(&mut self, expected: &str) {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {expected:?}"))
            .unwrap()
            .unwrap();
        assert_eq!(line, expected);
    }
}

#[tokio::test]
async fn registers_joins_and_answers_commands() {
    let db = Database::new(":memory:").await.unwrap();
    let config: Config = toml::from_str("").unwrap();
    let (sender, outgoing) = IrcSender::channel(16);
    let logger = Logger::with_sinks(
        Box::new(MemorySink::new()),
        Box::new(std::io::sink()),
        LogFilter::ALL,
    );
    let kernel = Kernel::builder(Arc::new(sender), Arc::new(logger))
        .nickname("straybot")
        .plugins(handlers::catalog(&config, &db).unwrap())
        .build()
        .unwrap();
    kernel.reload().unwrap();
    let kernel = Arc::new(kernel);

    let (client_io, server_io) = tokio::io::duplex(4096);
    let client = IrcClient::new(environment(), Arc::clone(&kernel), outgoing);
    let session = tokio::spawn(client.run_on(client_io));
    let mut server = Server::new(server_io);

    server.expect("NICK straybot").await;
    server.expect("USER straybot 0 * :Straylight Bot").await;

    server
        .send(":irc.example.net 433 * straybot :Nickname is already in use")
        .await;
    server.expect("NICK straybot_").await;

    server.send(":irc.example.net 001 straybot_ :Welcome to the network").await;
    server.expect("JOIN #bots").await;
    server.expect("JOIN #hockey").await;
    assert_eq!(kernel.nickname(), "straybot_");

    server.send("PING :irc.example.net").await;
    server.expect("PONG irc.example.net").await;

    server
        .send(":bob!bob@users.example PRIVMSG #bots :,about")
        .await;
    server.expect("PRIVMSG #bots :I'm a bot!").await;

    server
        .send(":bob!bob@users.example PRIVMSG straybot_ :,about")
        .await;
    server.expect("PRIVMSG bob :I'm a bot!").await;

    // Chatter and server notices produce nothing.
    server
        .send(":bob!bob@users.example PRIVMSG #bots :hello everyone")
        .await;
    server.send(":irc.example.net NOTICE * :*** Looking up your hostname").await;
    server.send("PING :still-there").await;
    server.expect("PONG still-there").await;

    drop(server);
    let finished = tokio::time::timeout(Duration::from_secs(2), session)
        .await
        .unwrap()
        .unwrap();
    assert!(finished.is_ok());
}

#[tokio::test]
async fn nick_collision_after_registration_is_ignored() {
    let harness = Harness::new(Vec::new());
    let (_sender, outgoing) = IrcSender::channel(4);
    let (client_io, server_io) = tokio::io::duplex(4096);
    let client = IrcClient::new(environment(), Arc::clone(&harness.kernel), outgoing);
    let _session = tokio::spawn(client.run_on(client_io));
    let mut server = Server::new(server_io);

    server.expect("NICK straybot").await;
    server.expect("USER straybot 0 * :Straylight Bot").await;
    server.send(":irc.example.net 001 straybot :Welcome").await;
    server.expect("JOIN #bots").await;
    server.expect("JOIN #hockey").await;

    server
        .send(":irc.example.net 433 straybot other :Nickname is already in use")
        .await;
    server.send(":straybot!straybot@bot.example NICK :straybot|away").await;
    server.send("PING :after").await;
    server.expect("PONG after").await;

    assert_eq!(harness.kernel.nickname(), "straybot|away");
}

#[tokio::test]
async fn quits_when_every_sender_is_gone() {
    let harness = Harness::new(Vec::new());
    let (sender, outgoing) = IrcSender::channel(4);
    drop(sender);

    let (client_io, server_io) = tokio::io::duplex(4096);
    let client = IrcClient::new(environment(), Arc::clone(&harness.kernel), outgoing);
    let session = tokio::spawn(client.run_on(client_io));
    let mut server = Server::new(server_io);

    server.expect("NICK straybot").await;
    server.expect("USER straybot 0 * :Straylight Bot").await;
    server.expect("QUIT :Shutting down").await;
    assert!(session.await.unwrap().is_ok());
}

#[tokio::test]
async fn undecodable_and_overlong_lines_do_not_end_the_session() {
    let db = Database::new(":memory:").await.unwrap();
    let config: Config = toml::from_str("").unwrap();
    let (sender, outgoing) = IrcSender::channel(16);
    let logger = Logger::with_sinks(
        Box::new(MemorySink::new()),
        Box::new(std::io::sink()),
        LogFilter::ALL,
    );
    let kernel = Kernel::builder(Arc::new(sender), Arc::new(logger))
        .nickname("straybot")
        .plugins(handlers::catalog(&config, &db).unwrap())
        .build()
        .unwrap();
    kernel.reload().unwrap();

    let (client_io, server_io) = tokio::io::duplex(4096);
    let client = IrcClient::new(environment(), Arc::new(kernel), outgoing);
    let session = tokio::spawn(client.run_on(client_io));
    let mut server = Server::new(server_io);

    server.expect("NICK straybot").await;
    server.expect("USER straybot 0 * :Straylight Bot").await;
    server.send(":irc.example.net 001 straybot :Welcome").await;
    server.expect("JOIN #bots").await;
    server.expect("JOIN #hockey").await;

    // Latin-1 text from a user, then a line past the length limit.
    server
        .send_raw(b":bob!bob@users.example PRIVMSG #bots :caf\xe9 au lait\r\n")
        .await;
    let overlong = format!(
        ":bob!bob@users.example PRIVMSG #bots :{}\r\n",
        "a".repeat(10_000)
    );
    server.send_raw(overlong.as_bytes()).await;

    server.send("PING :after").await;
    server.expect("PONG after").await;
    server
        .send(":bob!bob@users.example PRIVMSG #bots :,about")
        .await;
    server.expect("PRIVMSG #bots :I'm a bot!").await;
    assert!(!session.is_finished());
}

//! Test helpers for end-to-end chat tests.
//!
//! Provides a TestClient speaking the line protocol and a helper that
//! starts a ChatServer on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use chat_relay::{ActionLog, ChatServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Verb used as a round-trip barrier; the server answers it with `/unrecognized sync`.
const SYNC_VERB: &str = "sync";

/// Start a server on 127.0.0.1 with an ephemeral port.
pub async fn start_server() -> (SocketAddr, Arc<ChatServer>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(ChatServer::new("global", Arc::new(ActionLog::new())));

    tokio::spawn(server.clone().run(listener));

    (addr, server)
}

/// Test client for connecting to the relay.
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connect and consume the `/ready` prompt.
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            lines: BufReader::new(reader).lines(),
            writer,
        };

        assert_eq!(client.recv().await.as_deref(), Some("/ready"));
        client
    }

    /// Connect, complete the handshake and wait until it is processed.
    pub async fn login(addr: SocketAddr, username: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(&format!("/user {username}")).await;
        client.sync().await;
        client
    }

    /// Send one line.
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Next line, or `None` on EOF. Panics after DEFAULT_TIMEOUT.
    pub async fn recv(&mut self) -> Option<String> {
        timeout(DEFAULT_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap_or(None)
    }

    /// Round-trip a barrier and return every line received before its reply.
    ///
    /// Commands are handled in order per session, so everything this
    /// session sent earlier has been processed once the reply arrives.
    pub async fn sync(&mut self) -> Vec<String> {
        self.send(&format!("/{SYNC_VERB}")).await;

        let reply = format!("/unrecognized {SYNC_VERB}");
        let mut seen = Vec::new();
        loop {
            match self.recv().await {
                Some(line) if line == reply => return seen,
                Some(line) => seen.push(line),
                None => panic!("connection closed during sync, saw {seen:?}"),
            }
        }
    }
}

/// Wait until the registry holds `expected` sessions or DEFAULT_TIMEOUT elapses.
pub async fn wait_for_sessions(server: &ChatServer, expected: usize) -> bool {
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    loop {
        if server.registry().len().await == expected {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

//! ChatServer implementation
//!
//! Holds the registry, the broadcaster and the lobby name, and runs the
//! protocol state machine for each decoded command. Session state is
//! implicit in the session fields: a non-empty username means
//! authenticated, and `room` selects the message audience.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::action_log::ActionLog;
use crate::broadcast::Broadcaster;
use crate::codec::{ClientCommand, NoticeKind};
use crate::handler::handle_connection;
use crate::registry::Registry;
use crate::session::Session;

/// The chat relay
///
/// Shared by every connection task behind an `Arc`.
#[derive(Debug)]
pub struct ChatServer {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    action_log: Arc<ActionLog>,
    /// Room assigned on connect and after `leave`
    lobby: String,
}

impl ChatServer {
    /// Create a new ChatServer recording broadcasts into `action_log`
    pub fn new(lobby: impl Into<String>, action_log: Arc<ActionLog>) -> Self {
        let registry = Arc::new(Registry::new());
        let broadcaster = Broadcaster::new(registry.clone(), action_log.clone());

        Self {
            registry,
            broadcaster,
            action_log,
            lobby: lobby.into(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn action_log(&self) -> &Arc<ActionLog> {
        &self.action_log
    }

    /// Accept connections forever, one connection task each
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        info!("ChatServer started");

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let server = self.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, server).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Register a new session and prompt it for the handshake
    pub async fn open_session(
        &self,
        addr: SocketAddr,
        sender: mpsc::Sender<String>,
    ) -> Arc<Session> {
        let session = Arc::new(Session::new(addr, sender, &self.lobby));
        self.registry.register(session.clone()).await;

        info!("Session {} opened from {}", session.id(), addr);

        self.broadcaster
            .broadcast(NoticeKind::Ready, "", &session, true)
            .await;

        session
    }

    /// Process a single command
    pub async fn handle_command(&self, session: &Session, cmd: ClientCommand) {
        if session.is_closed() {
            debug!("Ignoring {:?} from closed session {}", cmd, session.id());
            return;
        }

        match cmd {
            ClientCommand::User(username) => self.handle_user(session, username).await,
            ClientCommand::Message(text) => self.handle_message(session, text).await,
            ClientCommand::Enter(room) => self.handle_enter(session, room).await,
            ClientCommand::Leave => self.handle_leave(session).await,
            ClientCommand::Ignore(username) => self.handle_ignore(session, username).await,
            ClientCommand::Disconnect => self.handle_disconnect(session).await,
            ClientCommand::Unrecognized(verb) => self.handle_unrecognized(session, verb).await,
        }
    }

    /// Tear down a session
    ///
    /// Safe to call more than once; only the first call has any effect.
    /// With `notify`, other sessions get a disconnect notice before the
    /// stream is closed.
    pub async fn close(&self, session: &Session, notify: bool) {
        if !session.mark_closed() {
            debug!("Session {} already closed", session.id());
            return;
        }

        if notify {
            self.broadcaster
                .broadcast(NoticeKind::Disconnect, "", session, false)
                .await;
        }

        session.close_stream().await;
        self.registry.unregister(session.id()).await;

        info!("Session {} closed", session.id());
    }

    /// Handle the username handshake
    async fn handle_user(&self, session: &Session, username: String) {
        if username.is_empty() {
            debug!("Empty username from {}", session.id());
            return;
        }

        let first_time = session.set_username(username.clone()).await;

        if first_time {
            info!("Session {} set username to '{}'", session.id(), username);
            self.broadcaster
                .broadcast(NoticeKind::Connect, "", session, false)
                .await;
        } else {
            debug!("Session {} renamed to '{}'", session.id(), username);
        }
    }

    /// Handle chat text
    async fn handle_message(&self, session: &Session, text: String) {
        self.broadcaster
            .broadcast(NoticeKind::Message, &text, session, false)
            .await;
    }

    /// Handle room entry
    async fn handle_enter(&self, session: &Session, room: String) {
        if room.is_empty() {
            debug!("Enter without a room from {}", session.id());
            return;
        }

        session.set_room(room.clone()).await;
        info!("Session {} entered room {}", session.id(), room);

        self.broadcaster
            .broadcast(NoticeKind::Enter, &room, session, false)
            .await;
    }

    /// Handle returning to the lobby
    async fn handle_leave(&self, session: &Session) {
        let vacated = session.set_room(self.lobby.clone()).await;

        if vacated == self.lobby {
            debug!("Session {} is already in the lobby", session.id());
            return;
        }

        info!("Session {} left room {}", session.id(), vacated);

        self.broadcaster
            .broadcast(NoticeKind::Leave, &vacated, session, false)
            .await;
    }

    /// Handle an ignore request, acknowledged to the sender only
    async fn handle_ignore(&self, session: &Session, username: String) {
        session.ignore(username.clone()).await;
        debug!("Session {} is ignoring '{}'", session.id(), username);

        self.broadcaster
            .broadcast(NoticeKind::Ignoring, &username, session, true)
            .await;
    }

    /// Handle an explicit disconnect
    ///
    /// The notice is sent here, so teardown runs without its own.
    async fn handle_disconnect(&self, session: &Session) {
        self.broadcaster
            .broadcast(NoticeKind::Disconnect, "", session, false)
            .await;
        self.close(session, false).await;
    }

    /// Report an unknown verb back to the sender
    async fn handle_unrecognized(&self, session: &Session, verb: String) {
        debug!("Unrecognized verb '{}' from {}", verb, session.id());

        self.broadcaster
            .broadcast(NoticeKind::Unrecognized, &verb, session, true)
            .await;
    }
}

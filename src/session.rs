//! Session struct definition
//!
//! Server-side state for one connected client: identity, room, ignore
//! list, and the outbound channel feeding the connection's write task.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, Notify, RwLock, RwLockReadGuard};

use crate::error::SendError;
use crate::types::SessionId;

/// Lines buffered per session before senders wait on the write task
pub const OUTBOUND_BUFFER: usize = 32;

/// Mutable per-session fields
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Empty until the `user` handshake; empty means anonymous
    pub username: String,
    /// Current room, the lobby on connect
    pub room: String,
    /// Usernames whose broadcasts this session suppresses
    pub ignoring: HashSet<String>,
}

/// Connected session
///
/// Created on accept and shared (`Arc`) between the registry, the
/// connection loop and any broadcaster iterating the registry.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    addr: SocketAddr,
    state: RwLock<SessionState>,
    /// Server → client lines; `None` once the stream is closed
    outbound: RwLock<Option<mpsc::Sender<String>>>,
    closed: AtomicBool,
    shutdown: Notify,
}

impl Session {
    /// Create a new anonymous session placed in `lobby`
    pub fn new(addr: SocketAddr, sender: mpsc::Sender<String>, lobby: &str) -> Self {
        Self {
            id: SessionId::new(),
            addr,
            state: RwLock::new(SessionState {
                room: lobby.to_string(),
                ..SessionState::default()
            }),
            outbound: RwLock::new(Some(sender)),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address of the connection
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Read access to the mutable fields
    pub async fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().await
    }

    pub async fn username(&self) -> String {
        self.state.read().await.username.clone()
    }

    pub async fn room(&self) -> String {
        self.state.read().await.room.clone()
    }

    /// Check if this session has completed the handshake
    pub async fn is_authenticated(&self) -> bool {
        !self.state.read().await.username.is_empty()
    }

    /// Set the username
    ///
    /// Returns true if the session was anonymous before this call.
    pub async fn set_username(&self, username: String) -> bool {
        let mut state = self.state.write().await;
        let was_anonymous = state.username.is_empty();
        state.username = username;
        was_anonymous
    }

    /// Move to `room`, returning the room just vacated
    pub async fn set_room(&self, room: String) -> String {
        let mut state = self.state.write().await;
        std::mem::replace(&mut state.room, room)
    }

    /// Add a username to the ignore set
    pub async fn ignore(&self, username: String) {
        self.state.write().await.ignoring.insert(username);
    }

    pub async fn is_ignoring(&self, username: &str) -> bool {
        self.state.read().await.ignoring.contains(username)
    }

    /// Queue a line for this session's stream
    ///
    /// Waits while the buffer is full. Returns an error if the stream is closed.
    pub async fn send(&self, line: String) -> Result<(), SendError> {
        // clone out so close_stream is not held up by a slow peer
        let Some(sender) = self.outbound.read().await.clone() else {
            return Err(SendError::ChannelClosed);
        };

        sender.send(line).await.map_err(|_| SendError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the session closed
    ///
    /// Returns true only for the first caller.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Close the outbound stream and wake the reader
    ///
    /// Lines already queued are still flushed by the write task.
    pub async fn close_stream(&self) {
        self.outbound.write().await.take();
        self.shutdown.notify_one();
    }

    /// Resolves once [`close_stream`](Self::close_stream) has been called
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }
}

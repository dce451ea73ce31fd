//! Line-Oriented TCP Chat Relay Library
//!
//! Clients connect over TCP, introduce themselves with a username, and
//! exchange newline-delimited messages with the other occupants of their
//! room.
//!
//! # Features
//! - Slash-command text protocol with reserved-character escaping
//! - Username handshake, anonymous sessions stay silent and deaf
//! - Rooms scoping chat messages, with a default lobby
//! - Per-session ignore lists
//! - Append-only action log with optional CSV persistence
//! - Read-only JSON endpoint over logged messages
//!
//! # Architecture
//! - `Registry` holds every live `Session` behind a single lock
//! - Each connection runs a read task, a handle task and a write task
//! - `ChatServer` interprets commands and `Broadcaster` fans notices out
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_relay::{ActionLog, ChatServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:5000").await.unwrap();
//!     let server = Arc::new(ChatServer::new("global", Arc::new(ActionLog::new())));
//!     server.run(listener).await;
//! }
//! ```

pub mod action_log;
pub mod broadcast;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod query;
pub mod registry;
pub mod server;
pub mod session;
pub mod terminal;
pub mod types;

// Re-export main types for convenience
pub use action_log::{Action, ActionLog};
pub use broadcast::Broadcaster;
pub use codec::{ClientCommand, Command, NoticeKind};
pub use config::{Config, Templates};
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use registry::Registry;
pub use server::ChatServer;
pub use session::{Session, SessionState};
pub use types::SessionId;

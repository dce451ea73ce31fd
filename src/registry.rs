//! Live session registry
//!
//! The only cross-session shared state. Registration, removal and
//! broadcast iteration all go through one `RwLock`, so a session being
//! removed is never observed half-way through a fan-out.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::session::Session;
use crate::types::SessionId;

/// Ordered collection of live sessions
#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<Vec<Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session
    ///
    /// Returns false if it is already present or has been closed;
    /// a removed session never comes back.
    pub async fn register(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.sessions.write().await;

        if session.is_closed() || sessions.iter().any(|s| s.id() == session.id()) {
            return false;
        }

        sessions.push(session);
        debug!("Total sessions: {}", sessions.len());
        true
    }

    /// Remove a session by identity
    ///
    /// Removing an absent session is a no-op returning false.
    pub async fn unregister(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;

        let Some(index) = sessions.iter().position(|s| s.id() == id) else {
            return false;
        };

        sessions.remove(index);
        debug!("Total sessions: {}", sessions.len());
        true
    }

    /// Hold the registry for a fan-out
    ///
    /// Registration and removal wait until the guard is dropped.
    pub async fn iter_guard(&self) -> RwLockReadGuard<'_, Vec<Arc<Session>>> {
        self.sessions.read().await
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.iter().any(|s| s.id() == id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

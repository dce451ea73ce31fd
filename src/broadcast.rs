//! Room-scoped fan-out
//!
//! Computes the recipients of a notice from the registry and queues the
//! encoded line on each of them. Recipient rules for non-direct notices:
//! - never the origin itself
//! - only authenticated sessions
//! - `message` only within the origin's room; the other kinds go to every room
//! - never a session ignoring the origin's username

use std::sync::Arc;

use tracing::{debug, warn};

use crate::action_log::ActionLog;
use crate::codec::{self, NoticeKind};
use crate::registry::Registry;
use crate::session::{Session, SessionState};

/// Delivers notices to sessions in the registry
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    action_log: Arc<ActionLog>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>, action_log: Arc<ActionLog>) -> Self {
        Self {
            registry,
            action_log,
        }
    }

    /// Send a notice originating from `origin`
    ///
    /// With `direct_only` the line goes to `origin` alone, without a
    /// username. Otherwise the notice is logged and fanned out; anonymous
    /// origins broadcast nothing. Returns the number of sessions the line
    /// was queued for. Delivery failures are logged and skipped.
    pub async fn broadcast(
        &self,
        kind: NoticeKind,
        body: &str,
        origin: &Session,
        direct_only: bool,
    ) -> usize {
        if direct_only {
            let line = codec::encode(kind.as_str(), None, body);
            return match origin.send(line).await {
                Ok(()) => 1,
                Err(e) => {
                    debug!("Direct {} to {} not delivered: {}", kind, origin.id(), e);
                    0
                }
            };
        }

        let (username, room) = {
            let state = origin.read().await;
            (state.username.clone(), state.room.clone())
        };

        if username.is_empty() {
            debug!("Dropping {} from anonymous session {}", kind, origin.id());
            return 0;
        }

        self.action_log
            .record(kind.as_str(), body, &username, origin.addr())
            .await;

        let line = codec::encode(kind.as_str(), Some(&username), body);
        let sessions = self.registry.iter_guard().await;
        let mut delivered = 0;

        for recipient in sessions.iter() {
            if recipient.id() == origin.id() {
                continue;
            }

            if !accepts(&*recipient.read().await, kind, &username, &room) {
                continue;
            }

            match recipient.send(line.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to deliver {} to {}: {}", kind, recipient.id(), e),
            }
        }

        debug!("{} from {} delivered to {} session(s)", kind, username, delivered);
        delivered
    }
}

/// Whether `recipient` should hear a notice from `origin_username` in `origin_room`
fn accepts(
    recipient: &SessionState,
    kind: NoticeKind,
    origin_username: &str,
    origin_room: &str,
) -> bool {
    if recipient.username.is_empty() {
        return false;
    }

    if kind == NoticeKind::Message && recipient.room != origin_room {
        return false;
    }

    !recipient.ignoring.contains(origin_username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::OUTBOUND_BUFFER;
    use tokio::sync::mpsc::{self, Receiver};

    struct Fixture {
        registry: Arc<Registry>,
        log: Arc<ActionLog>,
        broadcaster: Broadcaster,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(Registry::new());
            let log = Arc::new(ActionLog::new());
            let broadcaster = Broadcaster::new(registry.clone(), log.clone());
            Self {
                registry,
                log,
                broadcaster,
            }
        }

        async fn join(&self, username: &str) -> (Arc<Session>, Receiver<String>) {
            let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
            let session = Arc::new(Session::new("127.0.0.1:4000".parse().unwrap(), tx, "global"));
            if !username.is_empty() {
                session.set_username(username.to_string()).await;
            }
            self.registry.register(session.clone()).await;
            (session, rx)
        }
    }

    #[tokio::test]
    async fn test_direct_goes_to_origin_only() {
        let fx = Fixture::new();
        let (alice, mut alice_rx) = fx.join("alice").await;
        let (_bob, mut bob_rx) = fx.join("bob").await;

        let n = fx
            .broadcaster
            .broadcast(NoticeKind::Unrecognized, "dance", &alice, true)
            .await;

        assert_eq!(n, 1);
        assert_eq!(alice_rx.try_recv().unwrap(), "/unrecognized dance");
        assert!(bob_rx.try_recv().is_err());
        assert!(fx.log.is_empty().await);
    }

    #[tokio::test]
    async fn test_message_skips_sender_and_anonymous() {
        let fx = Fixture::new();
        let (alice, mut alice_rx) = fx.join("alice").await;
        let (_bob, mut bob_rx) = fx.join("bob").await;
        let (_anon, mut anon_rx) = fx.join("").await;

        let n = fx
            .broadcaster
            .broadcast(NoticeKind::Message, "hello", &alice, false)
            .await;

        assert_eq!(n, 1);
        assert_eq!(bob_rx.try_recv().unwrap(), "/message [alice] hello");
        assert!(alice_rx.try_recv().is_err());
        assert!(anon_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_anonymous_origin_broadcasts_nothing() {
        let fx = Fixture::new();
        let (anon, _anon_rx) = fx.join("").await;
        let (_bob, mut bob_rx) = fx.join("bob").await;

        let n = fx
            .broadcaster
            .broadcast(NoticeKind::Message, "psst", &anon, false)
            .await;

        assert_eq!(n, 0);
        assert!(bob_rx.try_recv().is_err());
        assert!(fx.log.is_empty().await);
    }

    #[tokio::test]
    async fn test_message_is_room_scoped() {
        let fx = Fixture::new();
        let (alice, _alice_rx) = fx.join("alice").await;
        let (bob, mut bob_rx) = fx.join("bob").await;
        let (_carol, mut carol_rx) = fx.join("carol").await;

        alice.set_room("vip".to_string()).await;
        bob.set_room("vip".to_string()).await;

        fx.broadcaster
            .broadcast(NoticeKind::Message, "secret", &alice, false)
            .await;

        assert_eq!(bob_rx.try_recv().unwrap(), "/message [alice] secret");
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_notices_ignore_room_filter() {
        // enter/leave reach every room, unlike message
        let fx = Fixture::new();
        let (alice, _alice_rx) = fx.join("alice").await;
        let (_bob, mut bob_rx) = fx.join("bob").await;

        alice.set_room("vip".to_string()).await;
        fx.broadcaster
            .broadcast(NoticeKind::Enter, "vip", &alice, false)
            .await;

        assert_eq!(bob_rx.try_recv().unwrap(), "/enter [alice] vip");
    }

    #[tokio::test]
    async fn test_ignoring_recipient_is_skipped() {
        let fx = Fixture::new();
        let (alice, _alice_rx) = fx.join("alice").await;
        let (bob, mut bob_rx) = fx.join("bob").await;

        bob.ignore("alice".to_string()).await;

        for kind in [NoticeKind::Message, NoticeKind::Enter, NoticeKind::Disconnect] {
            fx.broadcaster.broadcast(kind, "", &alice, false).await;
        }

        assert!(bob_rx.try_recv().is_err());
        // logged even though nobody heard it
        assert_eq!(fx.log.len().await, 3);
    }

    #[tokio::test]
    async fn test_broken_recipient_does_not_abort_fanout() {
        let fx = Fixture::new();
        let (alice, _alice_rx) = fx.join("alice").await;
        let (_bob, bob_rx) = fx.join("bob").await;
        let (_carol, mut carol_rx) = fx.join("carol").await;

        drop(bob_rx);

        let n = fx
            .broadcaster
            .broadcast(NoticeKind::Message, "still here", &alice, false)
            .await;

        assert_eq!(n, 1);
        assert_eq!(carol_rx.try_recv().unwrap(), "/message [alice] still here");
    }

    #[tokio::test]
    async fn test_broadcast_is_logged_before_fanout() {
        let fx = Fixture::new();
        let (alice, _alice_rx) = fx.join("alice").await;

        fx.broadcaster
            .broadcast(NoticeKind::Message, "into the void", &alice, false)
            .await;

        let actions = fx.log.query(Some("message"), None, Some("alice")).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].content, "into the void");
        assert_eq!(actions[0].ip, "127.0.0.1:4000");
    }
}

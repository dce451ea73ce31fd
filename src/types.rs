//! Session identity
//!
//! Usernames are not unique and may be empty, so sessions are told apart
//! by a random `SessionId` for their whole lifetime.

use uuid::Uuid;

/// Random per-connection identity, used as the registry key and in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_differ_per_session() {
        let ids: std::collections::HashSet<_> = (0..32).map(|_| SessionId::new()).collect();
        assert_eq!(ids.len(), 32);
    }

    #[test]
    fn test_display_is_uuid() {
        let id = SessionId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}

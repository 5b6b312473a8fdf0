//! Cart ownership: who a cart belongs to.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Opaque guest session token, carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity a cart belongs to. Exactly one variant applies per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    Guest(SessionId),
    User(UserId),
    Customer(CustomerId),
}

impl CartOwner {
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest(session) => write!(f, "guest:{session}"),
            Self::User(user) => write!(f, "user:{user}"),
            Self::Customer(customer) => write!(f, "customer:{customer}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_sessions_are_distinct() {
        assert_ne!(SessionId::mint(), SessionId::mint());
    }

    #[test]
    fn owners_of_different_kinds_never_collide() {
        let guest = CartOwner::Guest(SessionId("42".into()));
        let user = CartOwner::User(UserId("42".into()));
        assert_ne!(guest, user);
        assert_eq!(guest.to_string(), "guest:42");
        assert!(guest.is_guest());
        assert!(!user.is_guest());
    }
}

//! Who is asking: request credentials to a canonical [`CartOwner`].
//!
//! Authenticated credentials always win over a guest session cookie sent alongside them. A
//! guest token is minted only when the request carries none, and only then is a cookie issued.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{CartOwner, CustomerId, SessionId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatedUser {
    User(UserId),
    Customer(CustomerId),
}

impl From<AuthenticatedUser> for CartOwner {
    fn from(user: AuthenticatedUser) -> Self {
        match user {
            AuthenticatedUser::User(id) => CartOwner::User(id),
            AuthenticatedUser::Customer(id) => CartOwner::Customer(id),
        }
    }
}

/// What a request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub session: Option<SessionId>,
    pub user: Option<AuthenticatedUser>,
}

impl Credentials {
    pub fn guest(session: SessionId) -> Self {
        Self {
            session: Some(session),
            user: None,
        }
    }
}

/// The cookie the caller must set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
    pub http_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub owner: CartOwner,
    /// The guest session seen on the request, if any. For an authenticated owner its cart is
    /// merged when the storefront opens.
    pub guest_session: Option<SessionId>,
    pub set_cookie: Option<SessionCookie>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentityError {
    /// No session on the request and none could be minted. A deployment fault, not a user one.
    #[error("Session context unavailable: {0}")]
    SessionUnavailable(String),
}

pub trait SessionMinter: Send + Sync {
    fn mint(&self) -> Result<SessionId, IdentityError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSessionMinter;

impl SessionMinter for UuidSessionMinter {
    fn mint(&self) -> Result<SessionId, IdentityError> {
        Ok(SessionId::mint())
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    minter: Arc<dyn SessionMinter>,
    cookie_name: String,
    ttl: Duration,
}

impl IdentityResolver {
    pub fn new(
        minter: Arc<dyn SessionMinter>,
        cookie_name: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            minter,
            cookie_name: cookie_name.into(),
            ttl,
        }
    }

    pub fn resolve(&self, credentials: &Credentials) -> Result<ResolvedOwner, IdentityError> {
        let guest_session = credentials
            .session
            .clone()
            .filter(|session| !session.0.is_empty());

        if let Some(user) = &credentials.user {
            let owner = CartOwner::from(user.clone());
            debug!(%owner, "Resolved authenticated owner");
            return Ok(ResolvedOwner {
                owner,
                guest_session,
                set_cookie: None,
            });
        }

        if let Some(session) = guest_session {
            return Ok(ResolvedOwner {
                owner: CartOwner::Guest(session.clone()),
                guest_session: Some(session),
                set_cookie: None,
            });
        }

        let session = self.minter.mint()?;
        info!("Minted guest session");
        Ok(ResolvedOwner {
            owner: CartOwner::Guest(session.clone()),
            guest_session: Some(session.clone()),
            set_cookie: Some(SessionCookie {
                name: self.cookie_name.clone(),
                value: session.0,
                max_age: self.ttl,
                http_only: true,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    struct BrokenMinter;

    impl SessionMinter for BrokenMinter {
        fn mint(&self) -> Result<SessionId, IdentityError> {
            Err(IdentityError::SessionUnavailable("no entropy".into()))
        }
    }

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(Arc::new(UuidSessionMinter), "cart_session", WEEK)
    }

    #[test]
    fn authenticated_wins_over_guest_cookie() {
        let credentials = Credentials {
            session: Some(SessionId("stale".into())),
            user: Some(AuthenticatedUser::User(UserId("u1".into()))),
        };
        let resolved = resolver().resolve(&credentials).unwrap();

        assert_eq!(resolved.owner, CartOwner::User(UserId("u1".into())));
        assert_eq!(resolved.guest_session, Some(SessionId("stale".into())));
        assert_eq!(resolved.set_cookie, None);
    }

    #[test]
    fn existing_session_is_not_rotated() {
        let resolved = resolver()
            .resolve(&Credentials::guest(SessionId("abc".into())))
            .unwrap();
        assert_eq!(resolved.owner, CartOwner::Guest(SessionId("abc".into())));
        assert_eq!(resolved.set_cookie, None);
    }

    #[test]
    fn first_visit_mints_and_sets_cookie() {
        let resolved = resolver().resolve(&Credentials::default()).unwrap();
        let cookie = resolved.set_cookie.expect("cookie for a new session");

        assert_eq!(resolved.owner, CartOwner::Guest(SessionId(cookie.value.clone())));
        assert_eq!(cookie.name, "cart_session");
        assert_eq!(cookie.max_age, WEEK);
        assert!(cookie.http_only);
    }

    #[test]
    fn unmintable_session_is_fatal() {
        let resolver = IdentityResolver::new(Arc::new(BrokenMinter), "cart_session", WEEK);
        assert!(matches!(
            resolver.resolve(&Credentials::default()),
            Err(IdentityError::SessionUnavailable(_))
        ));
        let customer = Credentials {
            session: None,
            user: Some(AuthenticatedUser::Customer(CustomerId("c9".into()))),
        };
        assert!(resolver.resolve(&customer).is_ok());
    }
}

//! Pluggable request authenticators.
//!
//! The application holds an ordered chain of [`Authenticator`]s. Each inspects the request and
//! either resolves a user, declines (no credentials it understands), or fails.

use crate::{
    auth::current_user::CurrentUser,
    errors::{Error, Result},
    store::{CredentialStore, SessionStore},
    types::abbrev_uuid,
};
use axum::http::{header::AUTHORIZATION, request::Parts};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the user a request is made on behalf of.
    ///
    /// - `Ok(None)`: no credentials this authenticator handles, the next one may try
    /// - `Ok(Some(user))`: authenticated
    /// - `Err(_)`: credentials were presented but are malformed or belong to an unusable account
    async fn resolve(&self, parts: &Parts) -> Result<Option<CurrentUser>>;

    /// Scheme advertised in `WWW-Authenticate` when authentication is required but missing
    fn challenge(&self) -> Option<&str> {
        None
    }
}

/// `Authorization: <keyword> <key>` token authentication against the session store.
pub struct TokenAuthenticator {
    keyword: String,
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
}

impl TokenAuthenticator {
    pub fn new(keyword: impl Into<String>, users: Arc<dyn CredentialStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            keyword: keyword.into(),
            users,
            sessions,
        }
    }

    fn failed(&self, message: &str) -> Error {
        Error::Unauthenticated {
            message: Some(message.to_string()),
            challenge: Some(self.keyword.clone()),
        }
    }

    /// Extract the key from the `Authorization` header, if it uses our keyword.
    fn parse_header<'p>(&self, parts: &'p Parts) -> Result<Option<&'p str>> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(None);
        };

        let mut words = header.as_bytes().split(u8::is_ascii_whitespace).filter(|w| !w.is_empty());
        let Some(scheme) = words.next() else {
            return Ok(None);
        };
        if !scheme.eq_ignore_ascii_case(self.keyword.as_bytes()) {
            return Ok(None);
        }

        let Some(key) = words.next() else {
            return Err(self.failed("Invalid token header. No credentials provided."));
        };
        if words.next().is_some() {
            return Err(self.failed("Invalid token header. Token string should not contain spaces."));
        }

        std::str::from_utf8(key)
            .map(Some)
            .map_err(|_| self.failed("Invalid token header. Token string should not contain invalid characters."))
    }

    /// Resolve a raw key to its owner.
    ///
    /// Unknown or superseded keys are not an error: they yield `Ok(None)`.
    #[instrument(skip_all, err)]
    pub async fn authenticate_credentials(&self, key: &str) -> Result<Option<CurrentUser>> {
        let Some(session) = self.sessions.find_by_token(key).await? else {
            trace!("Token does not match an active session");
            return Ok(None);
        };

        match self.users.get_user(session.user_id).await? {
            Some(user) if user.is_active => {
                debug!(user_id = %abbrev_uuid(&user.id), "Authenticated by token");
                Ok(Some(CurrentUser {
                    user,
                    session: Some(session),
                }))
            }
            // Deactivation also shuts out tokens issued before it
            _ => Err(self.failed("User inactive or deleted.")),
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for TokenAuthenticator {
    async fn resolve(&self, parts: &Parts) -> Result<Option<CurrentUser>> {
        match self.parse_header(parts)? {
            Some(key) => self.authenticate_credentials(key).await,
            None => Ok(None),
        }
    }

    fn challenge(&self) -> Option<&str> {
        Some(&self.keyword)
    }
}

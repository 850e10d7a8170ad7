//! Extractors for the authenticated user.
//!
//! - [`MaybeUser`]: runs the authenticator chain, succeeds with `None` for anonymous requests
//! - [`CurrentUser`]: same, but rejects anonymous requests

use crate::{
    AppState,
    db::models::{user_sessions::UserSession, users::UserDBResponse},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

/// The user a request is made on behalf of.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserDBResponse,
    /// The session the request authenticated with, for token authentication
    pub session: Option<UserSession>,
}

/// Optional authentication. Errors from an authenticator still reject the request.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // First authenticator to resolve a user wins; the first error aborts the chain
        for authenticator in &state.authenticators {
            if let Some(user) = authenticator.resolve(parts).await? {
                return Ok(MaybeUser(Some(user)));
            }
        }

        trace!("No authenticator resolved a user");
        Ok(MaybeUser(None))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(user),
            MaybeUser(None) => Err(Error::PermissionDenied {
                message: "Authentication credentials were not provided.".to_string(),
                challenge: state.authenticators.iter().find_map(|a| a.challenge()).map(str::to_string),
            }),
        }
    }
}

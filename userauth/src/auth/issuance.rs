//! Token issuance: verify credentials, mint a token, make it the user's only active token.

use crate::{
    AppState,
    auth::{
        password::{self, Argon2Params},
        tokens::TokenGenerator,
    },
    config::AuthConfig,
    db::models::{user_sessions::UserSession, users::UserDBResponse},
    errors::{Error, FieldErrors, NON_FIELD_ERRORS, Result},
    store::{CredentialStore, SessionStore},
    types::abbrev_uuid,
};
use tracing::{info, instrument};

pub const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

fn invalid_credentials() -> Error {
    Error::Validation {
        errors: FieldErrors::single(NON_FIELD_ERRORS, INVALID_CREDENTIALS),
    }
}

/// Borrows the stores and generator out of [`AppState`] for one issuance.
pub struct TokenIssuer<'a> {
    users: &'a dyn CredentialStore,
    sessions: &'a dyn SessionStore,
    generator: &'a dyn TokenGenerator,
    config: &'a AuthConfig,
}

impl<'a> TokenIssuer<'a> {
    pub fn new(
        users: &'a dyn CredentialStore,
        sessions: &'a dyn SessionStore,
        generator: &'a dyn TokenGenerator,
        config: &'a AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            generator,
            config,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.users.as_ref(),
            state.sessions.as_ref(),
            state.token_generator.as_ref(),
            &state.config.auth,
        )
    }

    /// Check an email/password pair.
    ///
    /// Unknown email, wrong password and inactive account all produce the same
    /// `non_field_errors` validation error. For unknown emails the password is still hashed, so
    /// response time does not reveal whether the account exists.
    #[instrument(skip_all, err)]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<UserDBResponse> {
        let Some(user) = self.users.get_user_by_email(email).await? else {
            password::hash_password(password.to_string(), Argon2Params::from(&self.config.password)).await?;
            return Err(invalid_credentials());
        };

        let matches = password::verify_password(password.to_string(), user.password_hash.clone()).await?;
        if !matches || !user.is_active {
            return Err(invalid_credentials());
        }
        Ok(user)
    }

    /// Mint a token for `user` and store it, superseding the previous one.
    ///
    /// Not serialised per user: two concurrent issuances both succeed and whichever upsert lands
    /// last is the token that authenticates afterwards.
    #[instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)), err)]
    pub async fn issue_for(&self, user: &UserDBResponse) -> Result<UserSession> {
        let token = self.generator.generate(self.config.token.length);
        let session = self.sessions.upsert_for_user(user.id, &token).await?;

        info!(user_id = %abbrev_uuid(&user.id), "Issued session token");
        Ok(session)
    }

    /// [`Self::verify_credentials`] then [`Self::issue_for`]. Nothing is written if verification fails.
    pub async fn obtain(&self, email: &str, password: &str) -> Result<UserSession> {
        let user = self.verify_credentials(email, password).await?;
        self.issue_for(&user).await
    }
}

//! Storage seams for credentials and token sessions.
//!
//! The rest of the crate talks to persistence only through [`CredentialStore`] and
//! [`SessionStore`]. Two backends implement both traits:
//!
//! - [`postgres::PostgresStore`]: the production backend, built on the repositories in
//!   [`crate::db::handlers`]
//! - [`in_memory::InMemoryStore`]: a process-local backend for development and tests. Data is
//!   lost on restart.
//!
//! Which one is used is decided by `database.type` in the configuration.

use crate::db::{
    errors::Result,
    models::{
        user_sessions::UserSession,
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use crate::types::UserId;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// User records, keyed by id and by (normalised) email.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    /// - `DbError::UniqueViolation` on table `users` if the email is taken
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    /// Apply the supplied fields of `request`, leaving the others untouched.
    ///
    /// # Errors
    /// - `DbError::NotFound` if the user does not exist
    /// - `DbError::UniqueViolation` on table `users` if the new email belongs to someone else
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse>;
}

/// The single active token of each user.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Make `token` the only active token of `user_id`, replacing any previous one atomically.
    ///
    /// There is no lock around the caller's verify/generate/upsert sequence, so when the same
    /// user logs in concurrently the last write wins and the other token is superseded.
    ///
    /// # Errors
    /// - `DbError::UniqueViolation` on table `user_sessions` if another user already holds `token`
    async fn upsert_for_user(&self, user_id: UserId, token: &str) -> Result<UserSession>;

    /// Read-only lookup of the session holding `token`
    async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>>;

    async fn get_for_user(&self, user_id: UserId) -> Result<Option<UserSession>>;
}

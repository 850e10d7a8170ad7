//! In-memory backend for the credential and session stores.
//!
//! Mirrors the uniqueness rules of the PostgreSQL schema (unique email, one session per user,
//! unique token) so code exercised against it behaves the same in production. Everything is
//! lost on restart.

use super::{CredentialStore, SessionStore};
use crate::db::{
    errors::{DbError, Result},
    models::{
        user_sessions::UserSession,
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use crate::types::UserId;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserDBResponse>,
    sessions: HashMap<UserId, UserSession>,
    /// token -> owning user, kept in step with `sessions`
    tokens: HashMap<String, UserId>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users.values().any(|u| u.email == email && Some(u.id) != except)
    }
}

fn unique_violation(table: &str, constraint: &str) -> DbError {
    DbError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }
}

/// In-memory implementation of [`CredentialStore`] and [`SessionStore`].
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session records, across all users
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Flip `is_active` on a user. There is no API for this; it stands in for an administrator.
    pub async fn set_active(&self, id: UserId, is_active: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(DbError::NotFound)?;
        user.is_active = is_active;
        user.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a user and, like the `ON DELETE CASCADE` in postgres, its session.
    pub async fn delete_user(&self, id: UserId) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.remove(&id) {
            inner.tokens.remove(&session.token);
        }
        inner.users.remove(&id).is_some()
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&request.email, None) {
            return Err(unique_violation("users", "users_email_key"));
        }

        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            name: request.name.clone(),
            password_hash: request.password_hash.clone(),
            is_active: request.is_active,
            is_staff: request.is_staff,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        Ok(self.inner.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut inner = self.inner.write().await;
        if request.email.as_deref().is_some_and(|email| inner.email_taken(email, Some(id))) {
            return Err(unique_violation("users", "users_email_key"));
        }

        let user = inner.users.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(email) = &request.email {
            user.email = email.clone();
        }
        if let Some(name) = &request.name {
            user.name = name.clone();
        }
        if let Some(password_hash) = &request.password_hash {
            user.password_hash = password_hash.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryStore {
    async fn upsert_for_user(&self, user_id: UserId, token: &str) -> Result<UserSession> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(&user_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("user_sessions_user_id_fkey".to_string()),
                table: Some("user_sessions".to_string()),
                message: format!("user {user_id} does not exist"),
            });
        }
        if inner.tokens.get(token).is_some_and(|owner| *owner != user_id) {
            return Err(unique_violation("user_sessions", "user_sessions_token_key"));
        }

        let now = Utc::now();
        let session = match inner.sessions.remove(&user_id) {
            Some(previous) => {
                inner.tokens.remove(&previous.token);
                UserSession {
                    token: token.to_string(),
                    updated_at: now,
                    ..previous
                }
            }
            None => UserSession {
                id: Uuid::new_v4(),
                user_id,
                token: token.to_string(),
                created_at: now,
                updated_at: now,
            },
        };

        inner.tokens.insert(session.token.clone(), user_id);
        inner.sessions.insert(user_id, session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>> {
        let inner = self.inner.read().await;
        Ok(inner.tokens.get(token).and_then(|user_id| inner.sessions.get(user_id)).cloned())
    }

    async fn get_for_user(&self, user_id: UserId) -> Result<Option<UserSession>> {
        Ok(self.inner.read().await.sessions.get(&user_id).cloned())
    }
}

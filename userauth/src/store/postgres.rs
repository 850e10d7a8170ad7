//! PostgreSQL backend for the credential and session stores.

use super::{CredentialStore, SessionStore};
use crate::db::{
    errors::Result,
    handlers::{Repository, UserSessions, Users},
    models::{
        user_sessions::UserSession,
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use crate::types::UserId;
use sqlx::PgPool;

/// Stores backed by a connection pool. Every call acquires its own connection.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CredentialStore for PostgresStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).create(request).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_user_by_email(email).await
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).update(id, request).await
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresStore {
    async fn upsert_for_user(&self, user_id: UserId, token: &str) -> Result<UserSession> {
        let mut conn = self.pool.acquire().await?;
        UserSessions::new(&mut conn).upsert_for_user(user_id, token).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>> {
        let mut conn = self.pool.acquire().await?;
        UserSessions::new(&mut conn).find_by_token(token).await
    }

    async fn get_for_user(&self, user_id: UserId) -> Result<Option<UserSession>> {
        let mut conn = self.pool.acquire().await?;
        UserSessions::new(&mut conn).get_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_store_round_trip(pool: PgPool) {
        let store = PostgresStore::new(pool);

        let user = store
            .create_user(&UserCreateDBRequest::new("alice@example.com", "Alice", "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA"))
            .await
            .unwrap();
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().email, "alice@example.com");

        store.upsert_for_user(user.id, "t1").await.unwrap();
        store.upsert_for_user(user.id, "t2").await.unwrap();

        assert!(store.find_by_token("t1").await.unwrap().is_none());
        assert_eq!(store.find_by_token("t2").await.unwrap().unwrap().user_id, user.id);
        assert_eq!(store.get_for_user(user.id).await.unwrap().unwrap().token, "t2");
    }
}

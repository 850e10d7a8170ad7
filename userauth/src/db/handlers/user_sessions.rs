//! Database repository for token sessions.

use crate::db::{errors::Result, models::user_sessions::UserSession};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct UserSessions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> UserSessions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Store `token` as the only active token of `user_id`.
    ///
    /// A single statement: the first issuance inserts the row, later ones overwrite its token.
    /// Two concurrent calls for the same user both succeed and the last one to commit wins.
    #[instrument(skip(self, token), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn upsert_for_user(&mut self, user_id: UserId, token: &str) -> Result<UserSession> {
        let session = sqlx::query_as::<_, UserSession>(
            r#"
            INSERT INTO user_sessions (id, user_id, token)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                token = EXCLUDED.token,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(session)
    }

    #[instrument(skip(self, token), err)]
    pub async fn find_by_token(&mut self, token: &str) -> Result<Option<UserSession>> {
        let session = sqlx::query_as::<_, UserSession>("SELECT * FROM user_sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(session)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_for_user(&mut self, user_id: UserId) -> Result<Option<UserSession>> {
        let session = sqlx::query_as::<_, UserSession>("SELECT * FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    };
    use sqlx::PgPool;

    async fn create_user(pool: &PgPool, email: &str) -> UserId {
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
            .create(&UserCreateDBRequest::new(email, "Test", "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA"))
            .await
            .unwrap()
            .id
    }

    async fn session_count(pool: &PgPool, user_id: UserId) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_upsert_replaces_previous_token(pool: PgPool) {
        let user_id = create_user(&pool, "alice@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSessions::new(&mut conn);

        let first = repo.upsert_for_user(user_id, "first-token").await.unwrap();
        let second = repo.upsert_for_user(user_id, "second-token").await.unwrap();

        // Same row, new value
        assert_eq!(first.id, second.id);
        assert_eq!(second.token, "second-token");
        assert!(repo.find_by_token("first-token").await.unwrap().is_none());
        assert_eq!(repo.find_by_token("second-token").await.unwrap().unwrap().user_id, user_id);
        assert_eq!(repo.get_for_user(user_id).await.unwrap().unwrap().token, "second-token");

        drop(repo);
        drop(conn);
        assert_eq!(session_count(&pool, user_id).await, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_token_collision_across_users_is_rejected(pool: PgPool) {
        let alice = create_user(&pool, "alice@example.com").await;
        let bob = create_user(&pool, "bob@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSessions::new(&mut conn);

        repo.upsert_for_user(alice, "shared").await.unwrap();
        let err = repo.upsert_for_user(bob, "shared").await.unwrap_err();
        assert!(err.is_unique_violation_on("user_sessions"));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_sessions_cascade_with_user(pool: PgPool) {
        let user_id = create_user(&pool, "carol@example.com").await;
        let mut conn = pool.acquire().await.unwrap();

        UserSessions::new(&mut conn).upsert_for_user(user_id, "carol-token").await.unwrap();
        assert!(Users::new(&mut conn).delete(user_id).await.unwrap());
        assert!(UserSessions::new(&mut conn).find_by_token("carol-token").await.unwrap().is_none());
    }
}

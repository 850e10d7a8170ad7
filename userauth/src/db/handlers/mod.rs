//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection (or transaction), owns the queries for one table,
//! and returns models from [`crate::db::models`].
//!
//! - [`Users`]: user accounts, implements [`Repository`]
//! - [`UserSessions`]: the single active token per user
//!
//! ```ignore
//! use userauth::db::handlers::{Repository, Users};
//!
//! let mut conn = pool.acquire().await?;
//! let user = Users::new(&mut conn).get_user_by_email("alice@example.com").await?;
//! ```

pub mod repository;
pub mod user_sessions;
pub mod users;

pub use repository::Repository;
pub use user_sessions::UserSessions;
pub use users::Users;

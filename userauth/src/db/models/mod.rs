//! Database record models matching table schemas.
//!
//! These are distinct from the API models in [`crate::api::models`], so the storage
//! and wire representations can evolve independently.
//!
//! - [`users`]: user accounts and credentials
//! - [`user_sessions`]: the single active token of each user

pub mod user_sessions;
pub mod users;

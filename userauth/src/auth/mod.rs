//! Authentication: password hashing, token issuance and request authentication.
//!
//! Clients obtain a token from `POST /api/user/token` by presenting an email and password, then
//! send it on later requests as `Authorization: Token <token>`. A user holds at most one token;
//! obtaining a new one replaces the old.
//!
//! # Modules
//!
//! - [`password`]: argon2id hashing and verification
//! - [`tokens`]: random token generation
//! - [`issuance`]: credential verification and token rotation
//! - [`authenticator`]: turns request headers into a user
//! - [`current_user`]: axum extractors for handlers that need a user

pub mod authenticator;
pub mod current_user;
pub mod issuance;
pub mod password;
pub mod tokens;

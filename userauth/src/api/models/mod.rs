//! API request and response models.
//!
//! These are the wire types of the HTTP API, kept separate from the database records in
//! [`crate::db::models`].
//!
//! - [`users`]: registration and profile payloads
//! - [`auth`]: token issuance payloads
//! - [`validation`]: field rules and messages shared by both

pub mod auth;
pub mod users;
pub mod validation;

//! HTTP request handlers.
//!
//! - [`users`]: `POST /api/user/create`, `GET|PUT|PATCH /api/user/me`
//! - [`auth`]: `POST /api/user/token`

pub mod auth;
pub mod users;

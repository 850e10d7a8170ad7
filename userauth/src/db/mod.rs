//! Database layer for data persistence and access.
//!
//! Implemented with SQLx over PostgreSQL, following the repository pattern:
//!
//! ```text
//! ┌─────────────┐
//! │   Stores    │  (crate::store - CredentialStore / SessionStore)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Migrations live in `migrations/` and are embedded through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

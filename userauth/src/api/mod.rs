//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//! - **[`extract`]**: The JSON body extractor used by the handlers
//!
//! # Endpoints
//!
//! - `POST /api/user/create`: register
//! - `POST /api/user/token`: obtain a token, superseding any previous one
//! - `GET|PUT|PATCH /api/user/me`: the authenticated user's profile
//!
//! Authenticated requests send `Authorization: Token <token>`. The OpenAPI document is served at
//! `/api-docs/openapi.json` and rendered at `/docs`.

pub mod extract;
pub mod handlers;
pub mod models;

//! # userauth: user registration and token authentication
//!
//! `userauth` owns the user-authentication slice of a web application. It registers users,
//! exchanges an email and password for an opaque bearer token, and serves the authenticated
//! user's profile.
//!
//! ## Tokens
//!
//! Each user has at most one active token. `POST /api/user/token` verifies the credentials,
//! mints a fresh token and stores it as the user's only token, so the previous one stops
//! authenticating immediately. Requests authenticate with `Authorization: Token <token>`.
//!
//! Issuance does not lock per user: when the same user logs in twice concurrently, both calls
//! return a token but only the one stored last keeps working.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Handlers reach storage through
//! two traits in [`store`]:
//!
//! - [`store::CredentialStore`]: user records
//! - [`store::SessionStore`]: the token of each user
//!
//! Both are implemented over PostgreSQL (using the repositories in [`db`]) and in memory.
//! `database.type` in the configuration picks one.
//!
//! Authentication is an ordered chain of [`auth::authenticator::Authenticator`]s held in
//! [`AppState`]. The [`auth::current_user::CurrentUser`] extractor walks it and rejects
//! anonymous requests.
//!
//! ## Configuration
//!
//! YAML file plus `USERAUTH_`-prefixed environment overrides; see [`config`].

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod store;
pub mod telemetry;
#[cfg(test)]
mod test_utils;
pub mod types;

use crate::{
    auth::{
        authenticator::{Authenticator, TokenAuthenticator},
        tokens::{RandomTokenGenerator, TokenGenerator},
    },
    config::{CorsOrigin, DatabaseConfig, PoolSettings},
    openapi::ApiDoc,
    store::{CredentialStore, InMemoryStore, PostgresStore, SessionStore},
};
use axum::{
    Router,
    http::{self, HeaderValue, Method, StatusCode},
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub use config::Config;
pub use types::{SessionId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .users(store.clone())
///     .sessions(store)
///     .token_generator(Arc::new(RandomTokenGenerator))
///     .authenticators(vec![authenticator])
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub token_generator: Arc<dyn TokenGenerator>,
    /// Tried in order by the user extractors
    pub authenticators: Vec<Arc<dyn Authenticator>>,
}

impl AppState {
    /// State backed by a single store, authenticating with the configured token keyword.
    pub fn with_store<S>(config: Config, store: Arc<S>, token_generator: Arc<dyn TokenGenerator>) -> Self
    where
        S: CredentialStore + SessionStore + 'static,
    {
        let users: Arc<dyn CredentialStore> = store.clone();
        let sessions: Arc<dyn SessionStore> = store;
        let token_auth = TokenAuthenticator::new(config.auth.token.keyword.clone(), users.clone(), sessions.clone());

        AppState::builder()
            .config(config)
            .users(users)
            .sessions(sessions)
            .token_generator(token_generator)
            .authenticators(vec![Arc::new(token_auth) as Arc<dyn Authenticator>])
            .build()
    }
}

/// Get the database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let nonzero_secs = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(nonzero_secs(settings.idle_timeout_secs))
        .max_lifetime(nonzero_secs(settings.max_lifetime_secs))
        .connect(url)
        .await?;
    Ok(pool)
}

/// Build the application state for the configured backend.
///
/// For PostgreSQL this connects and runs migrations; the pool is returned so it can be closed on
/// shutdown.
async fn setup_state(config: &Config) -> anyhow::Result<(AppState, Option<PgPool>)> {
    let token_generator: Arc<dyn TokenGenerator> = Arc::new(RandomTokenGenerator);

    match &config.database {
        DatabaseConfig::External { url, pool } => {
            info!("Using external database");
            let pool = connect_pool(url, pool).await?;
            migrator().run(&pool).await?;

            let store = Arc::new(PostgresStore::new(pool.clone()));
            Ok((AppState::with_store(config.clone(), store, token_generator), Some(pool)))
        }
        DatabaseConfig::Memory => {
            info!("Using in-memory storage: data will be lost on shutdown");
            let store = Arc::new(InMemoryStore::new());
            Ok((AppState::with_store(config.clone(), store, token_generator), None))
        }
    }
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;

    let allow_origin = if origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::new();
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a path, while Url always serialises one
                values.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Requests still running after `timeout` are answered with `408 Request Timeout`.
fn create_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let user_routes = Router::new()
        .route("/create", post(api::handlers::users::create_user))
        .route("/token", post(api::handlers::auth::obtain_token))
        .route(
            "/me",
            get(api::handlers::users::get_me)
                .put(api::handlers::users::put_me)
                .patch(api::handlers::users::patch_me),
        );

    let cors_layer = create_cors_layer(&state.config)?;
    let request_timeout = state.config.request_timeout;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/user", user_routes)
        .with_state(state)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"))
        .layer(cors_layer)
        .layer(create_timeout_layer(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The assembled service: router plus the resources it must release on shutdown.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting with configuration: {:#?}", config);

        let (app_state, pool) = setup_state(&config).await?;
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Build an application over existing state, without touching a database
    pub fn from_state(state: AppState) -> anyhow::Result<Self> {
        let config = state.config.clone();
        let router = build_router(state)?;
        Ok(Self {
            router,
            config,
            pool: None,
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("userauth listening on http://{}", bind_addr);

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_config, create_test_state};
    use axum::http::{StatusCode, header};

    #[tokio::test]
    async fn test_healthz() {
        let (server, _) = create_test_app();
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_openapi_served() {
        let (server, _) = create_test_app();
        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status_ok();

        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/api/user/token"]["post"].is_object());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (server, _) = create_test_app();
        server.get("/api/user/nope").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slow_requests_time_out() {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(create_timeout_layer(Duration::from_millis(20)));
        let server = axum_test::TestServer::new(router).unwrap();

        server.get("/slow").await.assert_status(StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Url("https://app.example.com".parse().unwrap())];
        let (state, _) = create_test_state();
        let state = AppState { config, ..state };
        let server = Application::from_state(state).unwrap().into_test_server();

        let response = server
            .method(Method::OPTIONS, "/api/user/me")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://app.example.com"))
            .add_header(header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("GET"))
            .await;

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn test_memory_backend_from_config() {
        let mut config = create_test_config();
        config.database = DatabaseConfig::Memory;

        let server = Application::new(config).await.unwrap().into_test_server();
        server
            .post("/api/user/create")
            .json(&serde_json::json!({"email": "alice@example.com", "password": "secret123", "name": "Alice"}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_postgres_backend_end_to_end(pool: PgPool) {
        let store = Arc::new(PostgresStore::new(pool));
        let state = AppState::with_store(create_test_config(), store, Arc::new(RandomTokenGenerator));
        let server = Application::from_state(state).unwrap().into_test_server();

        server
            .post("/api/user/create")
            .json(&serde_json::json!({"email": "alice@example.com", "password": "secret123", "name": "Alice"}))
            .await
            .assert_status(StatusCode::CREATED);

        let first = server
            .post("/api/user/token")
            .json(&serde_json::json!({"email": "alice@example.com", "password": "secret123"}))
            .await
            .json::<serde_json::Value>()["token"]
            .as_str()
            .unwrap()
            .to_string();
        let second = server
            .post("/api/user/token")
            .json(&serde_json::json!({"email": "alice@example.com", "password": "secret123"}))
            .await
            .json::<serde_json::Value>()["token"]
            .as_str()
            .unwrap()
            .to_string();
        assert_ne!(first, second);

        let stale = HeaderValue::from_str(&format!("Token {first}")).unwrap();
        server.get("/api/user/me").add_header(header::AUTHORIZATION, stale).await.assert_status_unauthorized();

        let current = HeaderValue::from_str(&format!("Token {second}")).unwrap();
        let response = server.get("/api/user/me").add_header(header::AUTHORIZATION, current).await;
        response.assert_status_ok();
        response.assert_json(&serde_json::json!({"email": "alice@example.com", "name": "Alice"}));
    }
}

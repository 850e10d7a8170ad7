//! Shared fixtures for unit and handler tests.

use crate::{
    AppState, Application,
    auth::{
        password::{self, Argon2Params},
        tokens::SeededTokenGenerator,
    },
    config::{Config, DatabaseConfig},
    db::models::users::{UserCreateDBRequest, UserDBResponse},
    store::{CredentialStore, InMemoryStore},
};
use axum_test::TestServer;
use std::sync::Arc;

/// Argon2 parameters cheap enough to hash in every test
const TEST_ARGON2: Argon2Params = Argon2Params {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};

pub fn create_test_config() -> Config {
    let mut config = Config {
        database: DatabaseConfig::Memory,
        ..Default::default()
    };
    config.auth.password.argon2_memory_kib = TEST_ARGON2.memory_kib;
    config.auth.password.argon2_iterations = TEST_ARGON2.iterations;
    config.auth.password.argon2_parallelism = TEST_ARGON2.parallelism;
    config
}

/// State over a fresh in-memory store, with deterministic tokens.
///
/// The store is returned alongside so tests can seed and inspect it directly.
pub fn create_test_state() -> (AppState, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::with_store(create_test_config(), store.clone(), Arc::new(SeededTokenGenerator::new(42)));
    (state, store)
}

pub async fn create_test_user(store: &Arc<InMemoryStore>, email: &str, password: &str) -> UserDBResponse {
    let hash = password::hash_string_with_params(password, Some(TEST_ARGON2)).expect("Failed to hash test password");
    store
        .create_user(&UserCreateDBRequest::new(email, "Test User", hash))
        .await
        .expect("Failed to create test user")
}

pub fn create_test_app() -> (TestServer, Arc<InMemoryStore>) {
    create_test_app_with_config(create_test_config())
}

pub fn create_test_app_with_config(config: Config) -> (TestServer, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::with_store(config, store.clone(), Arc::new(SeededTokenGenerator::new(42)));
    let server = Application::from_state(state)
        .expect("Failed to create application")
        .into_test_server();
    (server, store)
}

//! Opaque session token generation.
//!
//! Tokens are drawn from `[A-Za-z0-9]`. The generator is injected into the application state so
//! tests can swap in a deterministic one.

use rand::{Rng, SeedableRng, distributions::Alphanumeric, rngs::StdRng};
use std::{fmt, sync::Mutex};

/// Default token length
pub const DEFAULT_TOKEN_LENGTH: usize = 40;

/// Mints token strings of a given length.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Draws tokens from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self, length: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}

/// Reproducible token sequence from a fixed seed. Not for production use.
pub struct SeededTokenGenerator {
    rng: Mutex<StdRng>,
}

impl SeededTokenGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl fmt::Debug for SeededTokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededTokenGenerator").finish_non_exhaustive()
    }
}

impl TokenGenerator for SeededTokenGenerator {
    fn generate(&self, length: usize) -> String {
        // A panic while holding the lock leaves the rng in a valid state
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        (&mut *rng).sample_iter(&Alphanumeric).take(length).map(char::from).collect()
    }
}

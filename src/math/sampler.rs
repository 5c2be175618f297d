//! Error sampling for encryption.
//!
//! The error distribution is ternary ({-1, 0, 1} uniform), the placeholder
//! the protocol ships with; consumers only depend on the sampler interface,
//! so a discrete Gaussian can replace it without touching call sites.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::modular::from_signed;

/// Sampler for small error values, backed by ChaCha20.
pub struct ErrorSampler {
    rng: ChaCha20Rng,
}

impl ErrorSampler {
    /// Sampler seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Seeded sampler for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// One ternary sample in {-1, 0, 1}.
    pub fn sample(&mut self) -> i64 {
        self.rng.gen_range(0..3) - 1
    }

    /// One sample mapped into [0, q).
    pub fn sample_mod(&mut self, q: u64) -> u64 {
        from_signed(self.sample(), q)
    }
}

impl Default for ErrorSampler {
    fn default() -> Self {
        Self::new()
    }
}

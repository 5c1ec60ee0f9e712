//! Seeded token sampling.
//!
//! Every sampling operation owns one [`TokenSampler`] built from its seed, so
//! a given seed always yields the same draw regardless of what ran before.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Uniform sampling without replacement over token pools.
#[derive(Debug, Clone)]
pub struct TokenSampler {
    rng: ChaCha8Rng,
}

impl TokenSampler {
    /// Creates a deterministic sampler.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draws `min(n, pool.len())` items uniformly without replacement.
    pub fn draw<T: Clone>(&mut self, pool: &[T], n: usize) -> Vec<T> {
        let mut drawn = self.shuffled(pool);
        drawn.truncate(n);
        drawn
    }

    /// Returns a shuffled copy of the pool.
    pub fn shuffled<T: Clone>(&mut self, pool: &[T]) -> Vec<T> {
        let mut items = pool.to_vec();
        items.shuffle(&mut self.rng);
        items
    }
}

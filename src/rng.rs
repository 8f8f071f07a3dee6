//! Randomness provider: the sole source of chance for every game.
//!
//! All outcome-determining draws flow through a [`RoundRng`], a deterministic
//! stream seeded per round from an [`EntropySource`]. Keeping the seed draw
//! and the outcome draws separate is what makes commit-reveal possible: the
//! seed is committed before any wager is accepted, and replaying the stream
//! from the revealed seed reproduces every draw of the round.

use crate::errors::{EngineError, EngineResult};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_core::OsRng;
use std::sync::Mutex;

/// Length in bytes of a round seed.
pub const SEED_LEN: usize = 32;

/// Source of raw entropy for round seeds.
///
/// If the source fails, bet placement fails with
/// [`EngineError::EntropyUnavailable`]; the engine never degrades to a weaker
/// generator.
pub trait EntropySource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]) -> EngineResult<()>;
}

/// Production entropy source backed by the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> EngineResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|_| EngineError::EntropyUnavailable)
    }
}

/// Deterministic entropy source for tests and simulation.
///
/// Seeds every round from a single reproducible stream, so a fixed seed
/// replays an identical sequence of rounds.
pub struct SeededEntropy {
    inner: Mutex<StdRng>,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> EngineResult<()> {
        let mut rng = self.inner.lock().expect("entropy lock poisoned");
        rng.fill_bytes(dest);
        Ok(())
    }
}

/// Per-round draw stream.
///
/// Each call is statistically independent and uniformly distributed. Draws
/// happen at round creation or at the precise transition that needs them and
/// are never re-derived from values already shown to the caller.
pub struct RoundRng {
    inner: Mutex<StdRng>,
}

impl RoundRng {
    /// Build the round's stream from a 32-byte seed.
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            inner: Mutex::new(StdRng::from_seed(seed)),
        }
    }

    /// Uniform draw in `[0, 1)` built from 53 random mantissa bits.
    pub fn uniform(&self) -> f64 {
        let mut rng = self.inner.lock().expect("rng lock poisoned");
        (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Unbiased integer draw in `[min, max]` inclusive.
    pub fn int_range(&self, min: u64, max: u64) -> u64 {
        let mut rng = self.inner.lock().expect("rng lock poisoned");
        rng.gen_range(min..=max)
    }

    /// Uniform Fisher-Yates shuffle.
    ///
    /// Comparator-based shuffles are biased and must never be used for deck
    /// or mine placement; this is the only shuffle in the crate.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.inner.lock().expect("rng lock poisoned");
        for i in (1..items.len()).rev() {
            let j = rng.gen_range(0..=i);
            items.swap(i, j);
        }
    }
}

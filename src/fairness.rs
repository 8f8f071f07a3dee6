//! Commit-reveal fairness for round seeds.
//!
//! Goals:
//! - Commit to the round's randomness before the wager is accepted: the
//!   sha256 of the seed is visible in every snapshot from creation onward.
//! - Reveal the raw seed only once the round is terminal, so an observer can
//!   recompute the commitment and replay the full draw stream.
//! - Keep verification independent of the engine: [`verify_reveal`] needs
//!   nothing but the two strings.

use crate::errors::EngineResult;
use crate::rng::{EntropySource, RoundRng, SEED_LEN};
use sha2::{Digest, Sha256};

/// A round's secret seed. The commitment may be shared freely; the seed bytes
/// stay private until the round settles.
#[derive(Clone)]
pub struct RoundSeed([u8; SEED_LEN]);

impl RoundSeed {
    /// Draw a fresh seed. Fails with `EntropyUnavailable` if the source does,
    /// in which case no wager is debited.
    pub fn generate(entropy: &dyn EntropySource) -> EngineResult<Self> {
        let mut bytes = [0u8; SEED_LEN];
        entropy.fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Hex-encoded sha256 of the seed, published at round creation.
    pub fn commitment(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hex::encode(hasher.finalize())
    }

    /// Hex-encoded seed bytes, published only after settlement.
    pub fn reveal(&self) -> String {
        hex::encode(self.0)
    }

    /// The draw stream this seed determines.
    pub fn stream(&self) -> RoundRng {
        RoundRng::from_seed(self.0)
    }
}

/// Check a revealed seed against its pre-bet commitment.
pub fn verify_reveal(commitment: &str, revealed_seed: &str) -> bool {
    let Ok(bytes) = hex::decode(revealed_seed) else {
        return false;
    };
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize()) == commitment
}

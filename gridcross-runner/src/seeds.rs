//! Deterministic RNG derivation.
//!
//! Each (instrument, iteration) pair gets its own stream derived from the
//! master seed, so adding an instrument or reordering the loop never changes
//! the windows sampled for the others.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Derive the sampling RNG for one optimization iteration.
pub fn rng_for(master_seed: u64, instrument: &str, iteration: u32) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(instrument.as_bytes());
    hasher.update(&iteration.to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(bytes))
}

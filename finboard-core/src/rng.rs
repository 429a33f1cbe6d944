//! Deterministic seed derivation for allocator runs.
//!
//! A master seed is expanded into one sub-seed per (symbol set, risk profile)
//! via BLAKE3. Symbols are sorted before hashing and the allocator assigns
//! draws in symbol order, so the request order of the tickers does not change
//! the allocation.

use crate::allocator::RiskProfile;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn sub_seed(&self, symbols: &[String], profile: RiskProfile) -> u64 {
        let mut sorted: Vec<String> = symbols.iter().map(|s| s.to_ascii_uppercase()).collect();
        sorted.sort();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        for s in &sorted {
            hasher.update(s.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(profile.as_str().as_bytes());

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, symbols: &[String], profile: RiskProfile) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbols, profile))
    }
}

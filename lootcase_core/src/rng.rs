use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use tracing::info;

// Reproducible sessions: seed phrase -> SHA-256 -> 32-byte StdRng seed.
// Only the hash is ever logged, so a run can be identified without echoing the phrase.

pub fn derive_seed(phrase: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(phrase.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hasher.finalize());
    seed
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

pub fn rng_from_phrase(phrase: &str) -> StdRng {
    StdRng::from_seed(derive_seed(phrase))
}

/// Seeded from the phrase when one is given, from OS entropy otherwise.
pub fn session_rng(phrase: Option<&str>) -> StdRng {
    match phrase {
        Some(phrase) => {
            info!(seed_hash = %derive_hash_hex(phrase.as_bytes()), "using seeded rng");
            rng_from_phrase(phrase)
        }
        None => StdRng::from_entropy(),
    }
}

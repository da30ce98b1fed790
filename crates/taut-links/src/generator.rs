use sha2::{Digest, Sha256};

/// Derives short codes from seeds.
///
/// Implementations are pure and storage-free: the same seed always
/// yields the same code. Uniqueness is the resolver's job, via its
/// collision-retry protocol.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Derives a short code from the given seed.
    fn generate(&self, seed: &str) -> String;
}

/// Derives codes as the hex-encoded SHA-256 of the seed, truncated to a
/// configured length.
///
/// Determinism is intentional: identical URLs converge on the same code,
/// which the resolver's uniqueness check then catches as a duplicate-URL
/// create rather than silently minting a second code.
#[derive(Debug, Clone)]
pub struct HashCodeGenerator {
    length: usize,
}

impl HashCodeGenerator {
    /// Creates a generator producing codes of `length` hex characters
    /// (capped at the digest length of 64).
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl CodeGenerator for HashCodeGenerator {
    fn generate(&self, seed: &str) -> String {
        let digest = Sha256::digest(seed.as_bytes());
        digest
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
            .chars()
            .take(self.length)
            .collect()
    }
}

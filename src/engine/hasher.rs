use sha2::{Digest, Sha256};

/// Digest size in bytes.
pub const SIZE: usize = 32;
/// Block size for incremental hashing, matching SHA-256's own block size.
pub const BLOCK_SIZE: usize = 64;

/// Incremental double-SHA256 hasher: `sum()` returns `SHA256(SHA256(input))`.
///
/// The second round is re-initialized on every `sum()` call and carries no
/// state between calls; only the first round accumulates across `write`s,
/// and only `reset()` clears it.
#[derive(Clone)]
pub struct DoubleSha256 {
    first_round: Sha256,
}

impl DoubleSha256 {
    pub fn new() -> Self {
        Self {
            first_round: Sha256::new(),
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        self.first_round.update(data);
    }

    pub fn sum(&self) -> [u8; SIZE] {
        let first = self.first_round.clone().finalize();
        Sha256::digest(first).into()
    }

    pub fn reset(&mut self) {
        self.first_round = Sha256::new();
    }
}

impl Default for DoubleSha256 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot double-SHA256 over a byte slice, used to cap oversized entropy
/// events before they are routed to a pool.
pub fn double_sha256(data: &[u8]) -> [u8; SIZE] {
    let mut hasher = DoubleSha256::new();
    hasher.write(data);
    hasher.sum()
}

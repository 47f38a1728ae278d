use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Fatal initialization failures (missing OS entropy, cipher construction
/// failure for a 32-byte key) are not represented here: the invariants they
/// protect cannot be safely recovered from, so those paths abort the process
/// instead of returning a value of this type.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid range: high ({high}) must be greater than low ({low})")]
    InvalidRange { high: u64, low: u64 },
}

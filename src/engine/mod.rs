//! The Fortuna engine: a keyed counter-mode generator continuously reseeded
//! from a 32-pool entropy accumulator fed by concurrent entropy sources.
//!
//! Lock ordering: the generator's mutex is always acquired before
//! `Accumulator::check_reseed` is invoked, which internally acquires (and
//! releases) the pool mutex before calling back into the generator. The
//! reverse order never occurs, so there is no cycle between the two locks.

mod accumulator;
mod cipher;
mod generator;
mod hasher;
mod host_entropy;
mod source;

use crate::config::AppConfig;
use crate::errors::EngineError;
use accumulator::Accumulator;
use generator::Generator;
use source::SourceHarness;
use std::sync::{Arc, Mutex};

pub use cipher::{aes256, BlockCipher, NewCipher};

/// Serializes access to the Generator and ties the Accumulator into the
/// public byte/integer APIs. This is the only type most callers need.
pub struct Engine {
    generator: Arc<Mutex<Generator>>,
    accumulator: Arc<Accumulator>,
    harness: Mutex<Option<SourceHarness>>,
}

impl Engine {
    /// Builds an engine with the given block-cipher constructor. Performs
    /// the required initial seeding from host entropy; panics if the OS
    /// entropy source is unavailable (see `engine::host_entropy`).
    pub fn with_cipher(new_cipher: NewCipher, config: &AppConfig) -> Self {
        let generator = Arc::new(Mutex::new(Generator::new(new_cipher)));
        let accumulator = Arc::new(Accumulator::new(
            config.min_pool_size,
            config.reseed_interval(),
        ));
        let harness = SourceHarness::new(Arc::clone(&accumulator));
        Self {
            generator,
            accumulator,
            harness: Mutex::new(Some(harness)),
        }
    }

    /// Builds an engine backed by AES-256, the default block cipher.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_cipher(aes256(), config)
    }

    /// Starts the two default entropy sources (OS-entropy tick, clock-hash
    /// tick) on the configured tick interval. Call once per engine.
    pub fn start_default_sources(&self, config: &AppConfig) {
        let mut guard = self.harness.lock().expect("harness mutex poisoned");
        let harness = guard.as_mut().expect("engine already shut down");
        source::spawn_default_sources(harness, Arc::clone(&self.generator), config.default_source_tick());
    }

    /// Registers an additional entropy source and returns its producer
    /// handle. Intended for non-default sources layered on top of the two
    /// the engine starts automatically.
    pub fn register_source(&self) -> source::SourceHandle {
        let mut guard = self.harness.lock().expect("harness mutex poisoned");
        let harness = guard.as_mut().expect("engine already shut down");
        harness.register_source(Arc::clone(&self.generator))
    }

    /// Broadcasts the stop signal to every ingestion task and awaits them.
    pub async fn shutdown(&self) {
        let harness = self.harness.lock().expect("harness mutex poisoned").take();
        if let Some(harness) = harness {
            harness.shutdown().await;
        }
    }

    /// Fills a buffer with `size` pseudo-random bytes, checking the reseed
    /// trigger first, under the generator's mutex.
    pub fn random_bytes(&self, size: usize) -> Vec<u8> {
        let mut generator = self.generator.lock().expect("generator mutex poisoned");
        self.accumulator.check_reseed(&mut generator);
        generator.pseudo_random_data(size)
    }

    /// Same as `random_bytes`, but requires the caller already has
    /// exclusive access to the engine (enforced by `&mut self`) instead of
    /// acquiring the generator mutex itself. Intended for single-threaded
    /// callers — benchmarks, tests — that want to skip the lock overhead.
    pub fn random_bytes_unlocked(&mut self, size: usize) -> Vec<u8> {
        let generator = Arc::get_mut(&mut self.generator)
            .expect("random_bytes_unlocked requires sole ownership of the generator (no sources or other handles outstanding)")
            .get_mut()
            .expect("generator mutex poisoned");
        self.accumulator.check_reseed(generator);
        generator.pseudo_random_data(size)
    }

    /// Fills `buf` from `random_bytes`, returning the number of bytes
    /// written (always `buf.len()`).
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let bytes = self.random_bytes(buf.len());
        buf.copy_from_slice(&bytes);
        buf.len()
    }

    /// A uniformly-distributed integer in `[low, high)`. `high` must be
    /// greater than `low`. The reduction via modulo introduces a modest
    /// bias when `high - low` does not divide `2^63`; acceptable for
    /// non-cryptographic selection, not for key material.
    pub fn get_rand(&self, high: u64, low: u64) -> Result<u64, EngineError> {
        if high <= low {
            return Err(EngineError::InvalidRange { high, low });
        }
        let mut bytes = self.random_bytes(8);
        bytes[0] &= 0x7f;
        let value = u64::from_be_bytes(bytes.try_into().unwrap());
        Ok((value % (high - low)) + low)
    }

    /// A non-negative 63-bit integer, read through the locked path.
    pub fn int63(&self) -> i64 {
        let mut generator = self.generator.lock().expect("generator mutex poisoned");
        self.accumulator.check_reseed(&mut generator);
        let mut bytes = generator.pseudo_random_data(8);
        bytes[0] &= 0x7f;
        i64::from_be_bytes(bytes.try_into().unwrap())
    }

    /// A uniformly-distributed 64-bit unsigned integer, read through the
    /// locked path.
    pub fn uint64(&self) -> u64 {
        let mut generator = self.generator.lock().expect("generator mutex poisoned");
        self.accumulator.check_reseed(&mut generator);
        generator.uint64()
    }

    /// Resets the generator to the unseeded state and reseeds it from `s`.
    /// Only meaningful for tests: it destroys all accumulated key material.
    pub fn seed(&self, s: i64) {
        let mut generator = self.generator.lock().expect("generator mutex poisoned");
        generator.reset();
        generator.reseed_from_i64(s);
    }

    #[cfg(test)]
    pub(crate) fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }
}

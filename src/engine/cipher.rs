use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256;
use std::sync::Arc;

/// A keyed block-encryption capability. Abstracted so the generator's core
/// logic never names a concrete cipher, and tests can substitute a
/// deterministic stand-in.
pub trait BlockCipher: Send + Sync {
    fn encrypt_block(&self, input: &[u8], output: &mut [u8]);
    fn block_size(&self) -> usize;
}

/// Constructs a `BlockCipher` from a 32-byte key. Construction failure for a
/// correctly-sized key is a fatal condition (see `Generator::set_key`); this
/// capability is expected to panic rather than return an error, matching the
/// specification's "no recovery path is defined" stance on cipher-init
/// failure.
pub type NewCipher = Arc<dyn Fn(&[u8; 32]) -> Box<dyn BlockCipher> + Send + Sync>;

struct Aes256Block(Aes256);

impl BlockCipher for Aes256Block {
    fn encrypt_block(&self, input: &[u8], output: &mut [u8]) {
        let mut block = GenericArray::clone_from_slice(input);
        self.0.encrypt_block(&mut block);
        output.copy_from_slice(&block);
    }

    fn block_size(&self) -> usize {
        16
    }
}

/// The default `NewCipher`: AES-256 in the raw block-encryption role
/// Fortuna needs (no mode of operation; the generator implements its own
/// counter mode on top of this).
pub fn aes256() -> NewCipher {
    Arc::new(|key: &[u8; 32]| {
        let key_array = GenericArray::from_slice(key);
        Box::new(Aes256Block(Aes256::new(key_array))) as Box<dyn BlockCipher>
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A trivial deterministic cipher (XOR with the key, repeated to the
    /// block) for tests that need a predictable, fast stand-in instead of
    /// AES. Never used outside `#[cfg(test)]`.
    struct XorBlock {
        key: [u8; 32],
    }

    impl BlockCipher for XorBlock {
        fn encrypt_block(&self, input: &[u8], output: &mut [u8]) {
            for (i, (o, b)) in output.iter_mut().zip(input.iter()).enumerate() {
                *o = b ^ self.key[i % self.key.len()];
            }
        }

        fn block_size(&self) -> usize {
            16
        }
    }

    pub fn xor_cipher() -> NewCipher {
        Arc::new(|key: &[u8; 32]| Box::new(XorBlock { key: *key }) as Box<dyn BlockCipher>)
    }
}

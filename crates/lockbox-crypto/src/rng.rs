//! Cryptographically secure randomness as an injected collaborator

use lockbox_core::{LockboxError, LockboxResult};
use rand::{rngs::OsRng, RngCore};

/// Source of cryptographically secure random bytes.
pub trait SecureRandom {
    fn fill(&mut self, dest: &mut [u8]) -> LockboxResult<()>;
}

/// Operating-system entropy via `OsRng`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) -> LockboxResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| LockboxError::Random(e.to_string()))
    }
}

impl<R: SecureRandom + ?Sized> SecureRandom for &mut R {
    fn fill(&mut self, dest: &mut [u8]) -> LockboxResult<()> {
        (**self).fill(dest)
    }
}

//! Key derivation: PBKDF2-HMAC-SHA256 password → file key

use hmac::Hmac;
use lockbox_core::{LockboxError, LockboxResult};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::rng::SecureRandom;
use crate::{KDF_ITERATIONS, KEY_SIZE, SALT_SIZE};

/// A 256-bit key derived from a password.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Length-checked construction from a slice.
    pub fn from_slice(bytes: &[u8]) -> LockboxResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            LockboxError::InvalidArgument(format!(
                "key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 128-bit key-derivation salt, stored in the clear next to the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> LockboxResult<Self> {
        let bytes: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
            LockboxError::InvalidArgument(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn generate(rng: &mut impl SecureRandom) -> LockboxResult<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        rng.fill(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Derive a 256-bit key from a password and salt using PBKDF2-HMAC-SHA256.
///
/// Deterministic: decryption reconstructs the encryption key from the salt
/// stored in the container.
pub fn derive_key(password: &SecretString, salt: &Salt) -> LockboxResult<DerivedKey> {
    tracing::debug!(iterations = KDF_ITERATIONS, "deriving key");

    // Filled in place; dropping on the error path scrubs the partial output
    let mut key = DerivedKey {
        bytes: [0u8; KEY_SIZE],
    };
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        password.expose_secret().as_bytes(),
        salt.as_bytes(),
        KDF_ITERATIONS,
        &mut key.bytes,
    )
    .map_err(|e| {
        LockboxError::KeyDerivation(format!("PBKDF2 could not produce a {KEY_SIZE}-byte key: {e}"))
    })?;

    Ok(key)
}

//! AES-256-GCM encryption/decryption of whole file contents
//!
//! Output format of [`encrypt`]:
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The nonce is 256 bits rather than the usual 96. GCM hashes longer nonces
//! into its initial counter block, which keeps random nonces collision-free
//! across every file of a batch that shares one key.

use aes_gcm::{
    aead::{consts::U32, Aead, KeyInit, Payload},
    aes::Aes256,
    AesGcm,
};
use lockbox_core::{LockboxError, LockboxResult};
use zeroize::Zeroizing;

use crate::kdf::DerivedKey;
use crate::rng::SecureRandom;
use crate::NONCE_SIZE;

/// AES-256-GCM with a 32-byte nonce and the default 16-byte tag
type Aes256Gcm32 = AesGcm<Aes256, U32>;

/// A 256-bit GCM nonce. Must never repeat under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> LockboxResult<Self> {
        let bytes: [u8; NONCE_SIZE] = bytes.try_into().map_err(|_| {
            LockboxError::InvalidArgument(format!(
                "nonce must be {NONCE_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Draw a fresh nonce. Called once per encryption, even when the key is
    /// reused across a batch.
    pub fn generate(rng: &mut impl SecureRandom) -> LockboxResult<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        rng.fill(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Encrypt `plaintext` with AES-256-GCM.
///
/// - `key`: the derived file key
/// - `nonce`: fresh per call
/// - `aad`: authenticated but unencrypted context, may be empty
///
/// Returns: `[ciphertext][16-byte tag]`
pub fn encrypt(
    key: &DerivedKey,
    nonce: &Nonce,
    plaintext: &[u8],
    aad: &[u8],
) -> LockboxResult<Vec<u8>> {
    let cipher = Aes256Gcm32::new(key.as_bytes().into());

    cipher
        .encrypt(
            nonce.as_bytes().into(),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| {
            LockboxError::InvalidArgument(format!(
                "plaintext of {} bytes exceeds the AES-GCM message limit",
                plaintext.len()
            ))
        })
}

/// Decrypt `ciphertext` (with trailing tag) using AES-256-GCM.
///
/// All-or-nothing: on tag mismatch no plaintext is returned. The plaintext
/// buffer is zeroized when dropped.
pub fn decrypt(
    key: &DerivedKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> LockboxResult<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm32::new(key.as_bytes().into());

    cipher
        .decrypt(
            nonce.as_bytes().into(),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| LockboxError::AuthenticationFailure)
}

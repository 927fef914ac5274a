//! lockbox-crypto: password-based file encryption for lockbox
//!
//! Pipeline: password + salt → PBKDF2-HMAC-SHA256 → AES-256-GCM → container
//!
//! ```text
//! Batch key (256-bit, PBKDF2 from password, one random salt per batch)
//!   └── File AEAD: AES-256-GCM (key=batch key, nonce=random 256-bit per file, AAD=configured)
//! ```
//!
//! Each container stores its own salt, so decryption re-derives the key per
//! file and never needs to know which batch produced it.

pub mod cipher;
pub mod container;
pub mod kdf;
pub mod rng;

pub use cipher::{decrypt, encrypt, Nonce};
pub use container::{is_valid_container, EncryptedContainer};
pub use kdf::{derive_key, DerivedKey, Salt};
pub use rng::{OsRandom, SecureRandom};

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce as stored in the container
pub const NONCE_SIZE: usize = 32;

/// Size of a key-derivation salt
pub const SALT_SIZE: usize = 16;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// PBKDF2 iteration count. Not stored in the container, so changing it
/// makes existing files undecryptable.
pub const KDF_ITERATIONS: u32 = 10_000;

//! Encrypted container: the on-disk record for one encrypted file
//!
//! Binary layout (integers little-endian):
//! ```text
//! [6 bytes: magic "LCKBOX"][1 byte: version]
//! [8 bytes: ciphertext length L][L bytes: ciphertext || 16-byte tag]
//! [32 bytes: nonce]
//! [16 bytes: salt]
//! [8 bytes: associated data length A][A bytes: associated data]
//! ```
//!
//! Nonce and salt are fixed-width, so a decoded container can never carry an
//! empty nonce or salt; truncated input fails to decode instead.

use lockbox_core::{LockboxError, LockboxResult};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::cipher::{self, Nonce};
use crate::kdf::{derive_key, DerivedKey, Salt};
use crate::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

const MAGIC: &[u8; 6] = b"LCKBOX";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;
const LEN_PREFIX: usize = 8;

/// Smallest well-formed container: empty plaintext, empty AAD.
pub const MIN_CONTAINER_LEN: usize =
    HEADER_LEN + LEN_PREFIX + TAG_SIZE + NONCE_SIZE + SALT_SIZE + LEN_PREFIX;

/// Immutable ciphertext + parameters record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContainer {
    ciphertext: Vec<u8>,
    nonce: Nonce,
    salt: Salt,
    associated_data: Vec<u8>,
}

impl EncryptedContainer {
    pub fn new(ciphertext: Vec<u8>, nonce: Nonce, salt: Salt, associated_data: Vec<u8>) -> Self {
        Self {
            ciphertext,
            nonce,
            salt,
            associated_data,
        }
    }

    /// Encrypt `plaintext` under `key` and package it with the parameters
    /// needed to decrypt it again. `salt` must be the salt `key` was derived
    /// from.
    pub fn seal(
        key: &DerivedKey,
        salt: Salt,
        nonce: Nonce,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> LockboxResult<Self> {
        let ciphertext = cipher::encrypt(key, &nonce, plaintext, associated_data)?;
        Ok(Self::new(ciphertext, nonce, salt, associated_data.to_vec()))
    }

    /// Decrypt with an already-derived key.
    pub fn open(&self, key: &DerivedKey) -> LockboxResult<Zeroizing<Vec<u8>>> {
        cipher::decrypt(key, &self.nonce, &self.ciphertext, &self.associated_data)
    }

    /// Re-derive the key from `password` and the stored salt, then decrypt.
    /// The key is dropped (and zeroized) before returning.
    pub fn open_with_password(&self, password: &SecretString) -> LockboxResult<Zeroizing<Vec<u8>>> {
        let key = derive_key(password, &self.salt)?;
        self.open(&key)
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn associated_data(&self) -> &[u8] {
        &self.associated_data
    }

    /// Serialize to the binary container format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            HEADER_LEN
                + LEN_PREFIX
                + self.ciphertext.len()
                + NONCE_SIZE
                + SALT_SIZE
                + LEN_PREFIX
                + self.associated_data.len(),
        );
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&(self.ciphertext.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(&(self.associated_data.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.associated_data);
        out
    }

    /// Deserialize from the binary container format
    pub fn from_bytes(data: &[u8]) -> LockboxResult<Self> {
        if !is_valid_container(data) {
            return Err(LockboxError::NotAContainer);
        }

        let mut reader = Reader::new(&data[HEADER_LEN..]);

        let ciphertext_len = reader.length("ciphertext")?;
        if ciphertext_len < TAG_SIZE {
            return Err(LockboxError::ContainerDecode(format!(
                "ciphertext is {ciphertext_len} bytes, shorter than the {TAG_SIZE}-byte tag"
            )));
        }
        let ciphertext = reader.take(ciphertext_len, "ciphertext")?.to_vec();
        let nonce = Nonce::from_slice(reader.take(NONCE_SIZE, "nonce")?)?;
        let salt = Salt::from_slice(reader.take(SALT_SIZE, "salt")?)?;
        let aad_len = reader.length("associated data")?;
        let associated_data = reader.take(aad_len, "associated data")?.to_vec();

        if reader.remaining() != 0 {
            return Err(LockboxError::ContainerDecode(format!(
                "{} trailing bytes after associated data",
                reader.remaining()
            )));
        }

        Ok(Self::new(ciphertext, nonce, salt, associated_data))
    }
}

/// Cheap structural pre-check: magic, version, and minimum length.
///
/// A `true` result does not guarantee [`EncryptedContainer::from_bytes`]
/// succeeds, only that the bytes claim to be a container.
pub fn is_valid_container(data: &[u8]) -> bool {
    data.len() >= MIN_CONTAINER_LEN
        && data.starts_with(MAGIC)
        && data[MAGIC.len()] == FORMAT_VERSION
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, field: &str) -> LockboxResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(LockboxError::ContainerDecode(format!(
                "truncated {field}: need {n} bytes, {} left",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn length(&mut self, field: &str) -> LockboxResult<usize> {
        let raw = self.take(LEN_PREFIX, field)?;
        let mut bytes = [0u8; LEN_PREFIX];
        bytes.copy_from_slice(raw);
        usize::try_from(u64::from_le_bytes(bytes)).map_err(|_| {
            LockboxError::ContainerDecode(format!("{field} length does not fit in memory"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEY_SIZE;

    fn test_container() -> EncryptedContainer {
        let key = DerivedKey::from_bytes([7u8; KEY_SIZE]);
        EncryptedContainer::seal(
            &key,
            Salt::from_bytes([0x5Au8; SALT_SIZE]),
            Nonce::from_bytes([0xA5u8; NONCE_SIZE]),
            b"file contents",
            b"aad",
        )
        .unwrap()
    }

    #[test]
    fn test_container_roundtrip() {
        let container = test_container();

        let bytes = container.to_bytes();
        let restored = EncryptedContainer::from_bytes(&bytes).unwrap();

        assert_eq!(restored, container);
        assert_eq!(restored.associated_data(), b"aad");
        assert_eq!(restored.ciphertext().len(), b"file contents".len() + TAG_SIZE);

        let key = DerivedKey::from_bytes([7u8; KEY_SIZE]);
        assert_eq!(restored.open(&key).unwrap().as_slice(), b"file contents");
    }

    #[test]
    fn test_field_order_is_stable() {
        let container = test_container();
        let bytes = container.to_bytes();
        let ct_len = container.ciphertext().len();

        assert_eq!(&bytes[..6], MAGIC);
        assert_eq!(bytes[6], FORMAT_VERSION);
        assert_eq!(&bytes[7..15], &(ct_len as u64).to_le_bytes());
        assert_eq!(&bytes[15..15 + ct_len], container.ciphertext());
        let nonce_at = 15 + ct_len;
        assert_eq!(&bytes[nonce_at..nonce_at + NONCE_SIZE], &[0xA5u8; NONCE_SIZE]);
        let salt_at = nonce_at + NONCE_SIZE;
        assert_eq!(&bytes[salt_at..salt_at + SALT_SIZE], &[0x5Au8; SALT_SIZE]);
        let aad_at = salt_at + SALT_SIZE;
        assert_eq!(&bytes[aad_at..aad_at + 8], &3u64.to_le_bytes());
        assert_eq!(&bytes[aad_at + 8..], b"aad");
    }

    #[test]
    fn test_empty_payload_is_minimum_length() {
        let key = DerivedKey::from_bytes([7u8; KEY_SIZE]);
        let container = EncryptedContainer::seal(
            &key,
            Salt::from_bytes([1u8; SALT_SIZE]),
            Nonce::from_bytes([2u8; NONCE_SIZE]),
            b"",
            b"",
        )
        .unwrap();
        assert_eq!(container.to_bytes().len(), MIN_CONTAINER_LEN);
        assert!(is_valid_container(&container.to_bytes()));
    }

    #[test]
    fn test_is_valid_container_rejects_foreign_bytes() {
        assert!(!is_valid_container(b""));
        assert!(!is_valid_container(b"just a text file that happens to be long enough to pass the length check ....."));
        assert!(!is_valid_container(&[0u8; MIN_CONTAINER_LEN * 2]));

        let mut bytes = test_container().to_bytes();
        assert!(is_valid_container(&bytes));
        bytes[6] = 2;
        assert!(!is_valid_container(&bytes), "unknown version must be rejected");
    }

    #[test]
    fn test_from_bytes_not_a_container() {
        let result = EncryptedContainer::from_bytes(b"plain old text");
        assert!(matches!(result, Err(LockboxError::NotAContainer)));
    }

    #[test]
    fn test_truncated_container() {
        let bytes = test_container().to_bytes();
        let result = EncryptedContainer::from_bytes(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(LockboxError::ContainerDecode(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = test_container().to_bytes();
        bytes.push(0);
        let result = EncryptedContainer::from_bytes(&bytes);
        assert!(matches!(result, Err(LockboxError::ContainerDecode(_))));
    }

    #[test]
    fn test_oversized_length_prefix() {
        let mut bytes = test_container().to_bytes();
        bytes[7..15].copy_from_slice(&u64::MAX.to_le_bytes());
        let result = EncryptedContainer::from_bytes(&bytes);
        assert!(matches!(result, Err(LockboxError::ContainerDecode(_))));
    }

    #[test]
    fn test_ciphertext_shorter_than_tag() {
        let mut bytes = test_container().to_bytes();
        bytes[7..15].copy_from_slice(&3u64.to_le_bytes());
        let result = EncryptedContainer::from_bytes(&bytes);
        assert!(matches!(result, Err(LockboxError::ContainerDecode(_))));
    }

    #[test]
    fn test_open_with_password() {
        let password = SecretString::from("hunter2");
        let salt = Salt::from_bytes([9u8; SALT_SIZE]);
        let key = derive_key(&password, &salt).unwrap();
        let container = EncryptedContainer::seal(
            &key,
            salt,
            Nonce::from_bytes([3u8; NONCE_SIZE]),
            b"payload",
            b"",
        )
        .unwrap();

        let plaintext = container.open_with_password(&password).unwrap();
        assert_eq!(plaintext.as_slice(), b"payload");

        let wrong = container.open_with_password(&SecretString::from("hunter3"));
        assert!(matches!(wrong, Err(LockboxError::AuthenticationFailure)));
    }
}

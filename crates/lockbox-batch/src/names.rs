//! Collision-free output names for encrypted and decrypted files
//!
//! Encryption appends `.{suffix}`; decryption strips it. When the candidate
//! already exists, an ASCII decimal counter starting at 0 is prepended to the
//! file name (`notes.txt.enc` → `0notes.txt.enc` → `1notes.txt.enc` ...).
//!
//! The existence probe and the later write are not atomic, so a concurrent
//! writer in the same directory can still race us into an overwrite.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use lockbox_core::config::NamingConfig;
use lockbox_core::{LockboxError, LockboxResult};

use crate::store::FileStore;

#[derive(Debug, Clone)]
pub struct NamingPolicy {
    /// Includes the leading dot
    suffix: String,
    fallback: String,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::from_config(&NamingConfig::default())
    }
}

impl NamingPolicy {
    pub fn new(suffix: &str, fallback: &str) -> Self {
        Self {
            suffix: format!(".{}", suffix.trim_start_matches('.')),
            fallback: fallback.to_string(),
        }
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(&config.suffix, &config.decrypted_fallback)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// `notes.txt` → `notes.txt.enc`, ignoring what exists on disk
    pub fn encrypted_file_name(&self, name: &OsStr) -> OsString {
        let mut out = name.to_os_string();
        out.push(&self.suffix);
        out
    }

    /// `notes.txt.enc` → `notes.txt`; names without the suffix are kept
    /// as-is, and a bare suffix (`.enc`) maps to the fallback name.
    ///
    /// Non-UTF-8 names are never stripped.
    pub fn decrypted_file_name(&self, name: &OsStr) -> OsString {
        match name.to_str().and_then(|s| s.strip_suffix(self.suffix.as_str())) {
            Some("") => OsString::from(&self.fallback),
            Some(stem) => OsString::from(stem),
            None => name.to_os_string(),
        }
    }

    /// First free output path for encrypting `original`.
    pub fn encryption_name(
        &self,
        original: &Path,
        store: &impl FileStore,
    ) -> LockboxResult<PathBuf> {
        let name = file_name(original)?;
        first_free(original, &self.encrypted_file_name(name), store)
    }

    /// First free output path for decrypting `encrypted`.
    pub fn decryption_name(
        &self,
        encrypted: &Path,
        store: &impl FileStore,
    ) -> LockboxResult<PathBuf> {
        let name = file_name(encrypted)?;
        first_free(encrypted, &self.decrypted_file_name(name), store)
    }
}

fn file_name(path: &Path) -> LockboxResult<&OsStr> {
    path.file_name().ok_or_else(|| {
        LockboxError::InvalidArgument(format!("path has no file name: {}", path.display()))
    })
}

/// Try `name`, then `0name`, `1name`, ... next to `sibling`.
fn first_free(sibling: &Path, name: &OsStr, store: &impl FileStore) -> LockboxResult<PathBuf> {
    let plain = sibling.with_file_name(name);
    if !taken(&plain, store)? {
        return Ok(plain);
    }

    for counter in 0u64.. {
        let mut prefixed = OsString::from(counter.to_string());
        prefixed.push(name);
        let candidate = sibling.with_file_name(prefixed);
        if !taken(&candidate, store)? {
            return Ok(candidate);
        }
    }

    Err(LockboxError::Other(anyhow::anyhow!(
        "no free output name for {}",
        plain.display()
    )))
}

fn taken(candidate: &Path, store: &impl FileStore) -> LockboxResult<bool> {
    store
        .exists(candidate)
        .map_err(|e| LockboxError::io(candidate, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalFs;
    use tempfile::TempDir;

    fn policy() -> NamingPolicy {
        NamingPolicy::default()
    }

    #[test]
    fn test_encryption_name_free() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("notes.txt");
        std::fs::write(&src, b"x").unwrap();

        let out = policy().encryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("notes.txt.enc"));
    }

    #[test]
    fn test_encryption_name_collision_prefixes_counter() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("notes.txt");
        std::fs::write(&src, b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt.enc"), b"old").unwrap();

        let out = policy().encryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("0notes.txt.enc"));
    }

    #[test]
    fn test_encryption_name_skips_taken_counters() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("notes.txt");
        std::fs::write(&src, b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt.enc"), b"").unwrap();
        for i in 0..25 {
            std::fs::write(tmp.path().join(format!("{i}notes.txt.enc")), b"").unwrap();
        }

        let out = policy().encryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("25notes.txt.enc"));
        assert!(!out.exists());
    }

    #[test]
    fn test_decryption_name_strips_suffix() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("report.pdf.enc");
        std::fs::write(&src, b"x").unwrap();

        let out = policy().decryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("report.pdf"));
    }

    #[test]
    fn test_decryption_name_collision() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("report.pdf.enc");
        std::fs::write(&src, b"x").unwrap();
        std::fs::write(tmp.path().join("report.pdf"), b"original").unwrap();

        let out = policy().decryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("0report.pdf"));
    }

    #[test]
    fn test_decryption_name_without_suffix_uses_counter() {
        let tmp = TempDir::new().unwrap();
        // The source itself occupies the as-is name
        let src = tmp.path().join("archive.bin");
        std::fs::write(&src, b"x").unwrap();

        let out = policy().decryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("0archive.bin"));
    }

    #[test]
    fn test_bare_suffix_uses_fallback() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join(".enc");
        std::fs::write(&src, b"x").unwrap();

        let out = policy().decryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("decrypted"));
    }

    #[test]
    fn test_custom_suffix() {
        let policy = NamingPolicy::new(".locked", "restored");
        assert_eq!(policy.suffix(), ".locked");
        assert_eq!(
            policy.encrypted_file_name(OsStr::new("a.txt")),
            OsString::from("a.txt.locked")
        );
        assert_eq!(
            policy.decrypted_file_name(OsStr::new("a.txt.locked")),
            OsString::from("a.txt")
        );
        assert_eq!(
            policy.decrypted_file_name(OsStr::new("a.txt.enc")),
            OsString::from("a.txt.enc")
        );
        assert_eq!(
            policy.decrypted_file_name(OsStr::new(".locked")),
            OsString::from("restored")
        );
    }

    proptest::proptest! {
        #[test]
        fn test_decrypted_name_inverts_encrypted_name(name in "[a-zA-Z0-9_. -]{1,40}") {
            let policy = policy();
            let encrypted = policy.encrypted_file_name(OsStr::new(&name));
            proptest::prop_assert_eq!(policy.decrypted_file_name(&encrypted), OsString::from(&name));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_encryption_name_treats_dangling_symlink_as_taken() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let src = tmp.path().join("notes.txt");
        std::fs::write(&src, b"x").unwrap();
        std::os::unix::fs::symlink(
            elsewhere.path().join("stolen.enc"),
            tmp.path().join("notes.txt.enc"),
        )
        .unwrap();

        let out = policy().encryption_name(&src, &LocalFs).unwrap();
        assert_eq!(out, tmp.path().join("0notes.txt.enc"));
    }

    /// A store whose existence probe always fails.
    struct Unreadable;

    impl FileStore for Unreadable {
        fn read_all(&self, _path: &Path) -> std::io::Result<Vec<u8>> {
            Err(std::io::ErrorKind::PermissionDenied.into())
        }

        fn write_all(&self, _path: &Path, _bytes: &[u8]) -> std::io::Result<()> {
            Err(std::io::ErrorKind::PermissionDenied.into())
        }

        fn probe(&self, _path: &Path) -> std::io::Result<crate::store::PathKind> {
            Err(std::io::ErrorKind::PermissionDenied.into())
        }

        fn list_files(&self, _dir: &Path, _recursive: bool) -> std::io::Result<Vec<PathBuf>> {
            Err(std::io::ErrorKind::PermissionDenied.into())
        }
    }

    #[test]
    fn test_probe_error_is_propagated() {
        let result = policy().encryption_name(Path::new("/locked/notes.txt"), &Unreadable);
        match result {
            Err(LockboxError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/locked/notes.txt.enc"))
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_path_without_file_name() {
        let result = policy().encryption_name(Path::new("/"), &LocalFs);
        assert!(matches!(result, Err(LockboxError::InvalidArgument(_))));
    }
}

//! Batch engine: resolve paths, then encrypt or decrypt them one by one
//!
//! Per invocation:
//!   - Prepare: for encryption, one random salt and one derived key for the
//!     whole batch. Decryption derives per file from each container's salt.
//!   - Iterate: every candidate ends as processed, skipped, or failed.
//!     Read errors, authentication failures and decode errors are per-file.
//!     Write errors and fatal crypto errors abort the batch.
//!   - Completed: the processed inputs, in iteration order.

use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use lockbox_core::{BatchMode, BatchOutcome, FileOutcome, LockboxError, LockboxResult, SkipReason};
use lockbox_crypto::{derive_key, is_valid_container, DerivedKey, EncryptedContainer, Nonce, Salt, SecureRandom};

use crate::names::NamingPolicy;
use crate::report::BatchReporter;
use crate::store::{FileStore, PathKind};

/// Progress callback type (files_done, files_total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

/// The set of paths a batch should consider
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub paths: Vec<PathBuf>,
    /// Expand directory inputs into the files they contain
    pub directory_mode: bool,
    /// Descend into subdirectories; only meaningful with `directory_mode`
    pub recursive: bool,
}

impl BatchRequest {
    pub fn files(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            directory_mode: false,
            recursive: false,
        }
    }

    pub fn directories(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self {
            paths,
            directory_mode: true,
            recursive,
        }
    }
}

pub struct BatchProcessor<'a, S, R> {
    store: S,
    rng: R,
    naming: NamingPolicy,
    reporter: &'a dyn BatchReporter,
    associated_data: Vec<u8>,
    progress: Option<&'a ProgressFn>,
}

impl<'a, S: FileStore, R: SecureRandom> BatchProcessor<'a, S, R> {
    pub fn new(store: S, rng: R, reporter: &'a dyn BatchReporter) -> Self {
        Self {
            store,
            rng,
            naming: NamingPolicy::default(),
            reporter,
            associated_data: Vec::new(),
            progress: None,
        }
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    /// Bind `aad` into every container this processor encrypts.
    pub fn with_associated_data(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.associated_data = aad.into();
        self
    }

    pub fn with_progress(mut self, progress: &'a ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(
        &mut self,
        mode: BatchMode,
        request: &BatchRequest,
        password: &SecretString,
    ) -> LockboxResult<BatchOutcome> {
        match mode {
            BatchMode::Encrypt => self.encrypt_batch(request, password),
            BatchMode::Decrypt => self.decrypt_batch(request, password),
        }
    }

    /// Encrypt every resolved file under one salt and one derived key.
    pub fn encrypt_batch(
        &mut self,
        request: &BatchRequest,
        password: &SecretString,
    ) -> LockboxResult<BatchOutcome> {
        let salt = Salt::generate(&mut self.rng)?;
        let key = derive_key(password, &salt)?;

        self.iterate(BatchMode::Encrypt, request, |this, path| {
            this.encrypt_one(path, &key, salt)
        })
    }

    /// Decrypt every resolved file, deriving a key from each container's salt.
    pub fn decrypt_batch(
        &mut self,
        request: &BatchRequest,
        password: &SecretString,
    ) -> LockboxResult<BatchOutcome> {
        self.iterate(BatchMode::Decrypt, request, |this, path| {
            this.decrypt_one(path, password)
        })
    }

    fn iterate<F>(
        &mut self,
        mode: BatchMode,
        request: &BatchRequest,
        mut step: F,
    ) -> LockboxResult<BatchOutcome>
    where
        F: FnMut(&mut Self, &Path) -> LockboxResult<FileOutcome>,
    {
        let mut outcome = BatchOutcome::default();
        let candidates = self.resolve(request, &mut outcome);
        let total = candidates.len() as u64;

        info!(mode = ?mode, candidates = total, "batch starting");

        for (i, path) in candidates.into_iter().enumerate() {
            if let Some(cb) = self.progress {
                cb(i as u64, total, &format!("[{}/{}] {}", i + 1, total, path.display()));
            }

            let result = match self.classify(mode, &path) {
                Ok(Some(reason)) => FileOutcome::Skipped(reason),
                Ok(None) => step(&mut *self, &path)?,
                Err(e) => FileOutcome::Failed(e),
            };

            self.report(&path, &result);
            outcome.record(path, &result);
        }

        if let Some(cb) = self.progress {
            cb(total, total, "done");
        }

        info!(
            mode = ?mode,
            processed = outcome.processed(),
            skipped = outcome.skipped,
            failed = outcome.failed,
            "batch complete"
        );

        Ok(outcome)
    }

    /// Expand the request into candidate paths, preserving input order.
    fn resolve(&self, request: &BatchRequest, outcome: &mut BatchOutcome) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(request.paths.len());

        for path in &request.paths {
            let expand = request.directory_mode
                && matches!(self.store.probe(path), Ok(PathKind::Directory));
            if !expand {
                candidates.push(path.clone());
                continue;
            }

            match self.store.list_files(path, request.recursive) {
                Ok(files) => {
                    debug!(dir = %path.display(), files = files.len(), "expanded directory");
                    candidates.extend(files);
                }
                Err(e) => {
                    let err = LockboxError::io(path, e);
                    self.reporter.failed(path, &err);
                    outcome.failed += 1;
                }
            }
        }

        candidates
    }

    /// `Some(reason)` when the path is not something this mode can process.
    fn classify(&self, mode: BatchMode, path: &Path) -> LockboxResult<Option<SkipReason>> {
        let kind = self
            .store
            .probe(path)
            .map_err(|e| LockboxError::io(path, e))?;

        Ok(match kind {
            PathKind::Missing => Some(SkipReason::NotFound),
            PathKind::Directory => Some(SkipReason::Directory),
            PathKind::Other => Some(SkipReason::NotRegularFile),
            PathKind::File { len: 0 } if mode == BatchMode::Encrypt => Some(SkipReason::Empty),
            PathKind::File { .. } => None,
        })
    }

    fn encrypt_one(
        &mut self,
        path: &Path,
        key: &DerivedKey,
        salt: Salt,
    ) -> LockboxResult<FileOutcome> {
        let plaintext = match self.store.read_all(path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) => return Ok(FileOutcome::Failed(LockboxError::io(path, e))),
        };

        let nonce = Nonce::generate(&mut self.rng)?;
        let container =
            EncryptedContainer::seal(key, salt, nonce, &plaintext, &self.associated_data)?;

        let output = self.naming.encryption_name(path, &self.store)?;
        self.write_output(&output, &container.to_bytes())?;

        Ok(FileOutcome::Processed { output })
    }

    fn decrypt_one(&mut self, path: &Path, password: &SecretString) -> LockboxResult<FileOutcome> {
        let bytes = match self.store.read_all(path) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(FileOutcome::Failed(LockboxError::io(path, e))),
        };

        if !is_valid_container(&bytes) {
            return Ok(FileOutcome::Skipped(SkipReason::NotAContainer));
        }

        let plaintext = match EncryptedContainer::from_bytes(&bytes)
            .and_then(|container| container.open_with_password(password))
        {
            Ok(plaintext) => plaintext,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(FileOutcome::Failed(e)),
        };

        let output = self.naming.decryption_name(path, &self.store)?;
        self.write_output(&output, &plaintext)?;

        Ok(FileOutcome::Processed { output })
    }

    /// Write errors abort the batch.
    fn write_output(&self, output: &Path, bytes: &[u8]) -> LockboxResult<()> {
        self.store
            .write_all(output, bytes)
            .map_err(|e| LockboxError::io(output, e))
    }

    fn report(&self, path: &Path, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Processed { output } => self.reporter.processed(path, output),
            FileOutcome::Skipped(reason) => self.reporter.skipped(path, *reason),
            FileOutcome::Failed(err) => self.reporter.failed(path, err),
        }
    }
}

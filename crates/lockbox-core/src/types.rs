use std::fmt;
use std::path::PathBuf;

use crate::error::LockboxError;

/// Direction of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Encrypt,
    Decrypt,
}

impl BatchMode {
    pub fn verb(&self) -> &'static str {
        match self {
            BatchMode::Encrypt => "encrypted",
            BatchMode::Decrypt => "decrypted",
        }
    }
}

/// Why a candidate path was not processed. Skips are expected conditions,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    Directory,
    NotRegularFile,
    Empty,
    NotAContainer,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NotFound => "does not exist",
            SkipReason::Directory => "is a directory",
            SkipReason::NotRegularFile => "is not a regular file",
            SkipReason::Empty => "is empty",
            SkipReason::NotAContainer => "is not an encrypted container",
        };
        f.write_str(reason)
    }
}

/// Result of processing one candidate path.
///
/// Fatal conditions never appear here; they abort the batch through the
/// `Err` arm of the per-file step instead.
#[derive(Debug)]
pub enum FileOutcome {
    Processed { output: PathBuf },
    Skipped(SkipReason),
    Failed(LockboxError),
}

/// Result of a whole batch invocation
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Input paths that were processed, in iteration order
    pub succeeded: Vec<PathBuf>,
    /// Output paths written, aligned index-for-index with `succeeded`
    pub outputs: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn record(&mut self, input: PathBuf, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Processed { output } => {
                self.succeeded.push(input);
                self.outputs.push(output.clone());
            }
            FileOutcome::Skipped(_) => self.skipped += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.succeeded.len()
    }
}

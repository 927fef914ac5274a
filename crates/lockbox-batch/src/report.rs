//! Per-file event sink, passed explicitly into the batch engine

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use lockbox_core::{LockboxError, SkipReason};
use tracing::{info, warn};

pub trait BatchReporter {
    fn skipped(&self, path: &Path, reason: SkipReason);

    fn failed(&self, path: &Path, error: &LockboxError);

    fn processed(&self, _path: &Path, _output: &Path) {}
}

/// Emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl BatchReporter for TracingReporter {
    fn skipped(&self, path: &Path, reason: SkipReason) {
        warn!(path = %path.display(), %reason, "skipped");
    }

    fn failed(&self, path: &Path, error: &LockboxError) {
        warn!(path = %path.display(), error = %error, "failed");
    }

    fn processed(&self, path: &Path, output: &Path) {
        info!(path = %path.display(), output = %output.display(), "processed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Skipped(PathBuf, SkipReason),
    /// Path and rendered error
    Failed(PathBuf, String),
    Processed(PathBuf, PathBuf),
}

/// Records every event in memory, in order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: RefCell<Vec<ReportEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.borrow().clone()
    }

    pub fn skipped_paths(&self) -> Vec<(PathBuf, SkipReason)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Skipped(p, r) => Some((p.clone(), *r)),
                _ => None,
            })
            .collect()
    }

    pub fn failed_paths(&self) -> Vec<PathBuf> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Failed(p, _) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl BatchReporter for CollectingReporter {
    fn skipped(&self, path: &Path, reason: SkipReason) {
        self.events
            .borrow_mut()
            .push(ReportEvent::Skipped(path.to_path_buf(), reason));
    }

    fn failed(&self, path: &Path, error: &LockboxError) {
        self.events
            .borrow_mut()
            .push(ReportEvent::Failed(path.to_path_buf(), error.to_string()));
    }

    fn processed(&self, path: &Path, output: &Path) {
        self.events.borrow_mut().push(ReportEvent::Processed(
            path.to_path_buf(),
            output.to_path_buf(),
        ));
    }
}

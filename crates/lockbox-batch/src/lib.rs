//! lockbox-batch: applies the encryption pipeline across many files
//!
//! Files are processed strictly one at a time, in input order. Each file
//! ends in a [`FileOutcome`](lockbox_core::FileOutcome); only fatal errors
//! (write failures, broken key derivation, broken randomness) stop a batch.

pub mod engine;
pub mod names;
pub mod report;
pub mod store;

pub use engine::{BatchProcessor, BatchRequest, ProgressFn};
pub use names::NamingPolicy;
pub use report::{BatchReporter, CollectingReporter, ReportEvent, TracingReporter};
pub use store::{FileStore, LocalFs, PathKind};

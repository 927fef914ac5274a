use std::path::PathBuf;

use thiserror::Error;

pub type LockboxResult<T> = Result<T, LockboxError>;

#[derive(Debug, Error)]
pub enum LockboxError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes do not carry the container magic/version, or are too short
    /// to hold even an empty container.
    #[error("not a lockbox container")]
    NotAContainer,

    #[error("malformed container: {0}")]
    ContainerDecode(String),

    /// Tag verification failed. Wrong password and tampered data are
    /// deliberately indistinguishable.
    #[error("authentication failed: wrong password or corrupted file")]
    AuthenticationFailure,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("secure random source failed: {0}")]
    Random(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LockboxError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LockboxError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that indicate broken wiring or a broken environment rather than
    /// a bad input file. The batch loop aborts on these.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LockboxError::KeyDerivation(_)
                | LockboxError::InvalidArgument(_)
                | LockboxError::Random(_)
                | LockboxError::Config(_)
        )
    }
}

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// A signal probe failed. The detector degrades the affected signal to
/// "busy" and keeps going; this is never fatal to the monitor.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("probe command failed: {0}")]
    Io(#[from] io::Error),
    #[error("unparseable probe output: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum LeaseError {
    /// Client error: the requested duration is zero or negative. The lease
    /// file is not touched.
    #[error("lease duration must be positive, got {0}")]
    InvalidDuration(i64),
    /// Internal error: the lease file could not be written.
    #[error("lease persistence failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum SuspendActionError {
    #[error("suspend command failed to start: {0}")]
    Io(#[from] io::Error),
    #[error("suspend command exited with {0}")]
    Failed(ExitStatus),
    #[error("suspend command timed out after {0:?}")]
    Timeout(Duration),
}

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::MAX_LEASE_SECS;
use crate::error::LeaseError;
use crate::persist::{atomic_write, unix_now};

/// File-backed stay-awake lease. The file holds a single ASCII integer: the
/// Unix timestamp at which the lease expires.
///
/// The override service is the only writer; the monitor and the status
/// reporter are readers. Writes go through a temp-file-then-rename so a
/// reader never observes a torn value, and an expired lease is reaped by
/// whichever reader sees it first.
#[derive(Debug, Clone)]
pub struct LeaseStore {
    path: PathBuf,
}

impl LeaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grant a lease for `seconds` from now, replacing any existing lease
    /// (last writer wins). Returns the effective duration, which is capped
    /// at 24 hours. `seconds <= 0` is rejected without touching the file.
    pub fn grant(&self, seconds: i64) -> Result<i64, LeaseError> {
        self.grant_at(unix_now(), seconds)
    }

    pub fn grant_at(&self, now: i64, seconds: i64) -> Result<i64, LeaseError> {
        if seconds <= 0 {
            return Err(LeaseError::InvalidDuration(seconds));
        }
        let seconds = seconds.min(MAX_LEASE_SECS);
        let expires_at = now + seconds;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        atomic_write(&self.path, expires_at.to_string().as_bytes())?;
        debug!("lease written, expires at {}", expires_at);
        Ok(seconds)
    }

    /// True iff an unexpired lease exists. Deletes the lease file once it
    /// has expired, so later readers skip the parse entirely.
    pub fn is_active(&self) -> bool {
        self.is_active_at(unix_now())
    }

    pub fn is_active_at(&self, now: i64) -> bool {
        match self.read_expiry() {
            Some(expires_at) if expires_at > now => true,
            Some(_) => {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!(
                        "failed to remove expired lease {}: {}",
                        self.path.display(),
                        e
                    );
                }
                false
            }
            None => false,
        }
    }

    /// Seconds until the lease expires, 0 when inactive.
    pub fn remaining(&self) -> i64 {
        self.remaining_at(unix_now())
    }

    pub fn remaining_at(&self, now: i64) -> i64 {
        match self.read_expiry() {
            Some(expires_at) => (expires_at - now).max(0),
            None => 0,
        }
    }

    fn read_expiry(&self) -> Option<i64> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("failed to read lease file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match raw.trim().parse::<i64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                // unparseable content counts as no lease; left in place for
                // inspection rather than silently deleted
                warn!(
                    "corrupt lease file {}: {:?}",
                    self.path.display(),
                    raw.trim()
                );
                None
            }
        }
    }
}

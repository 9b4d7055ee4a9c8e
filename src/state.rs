use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::persist::atomic_write;
use crate::status::format_ts;

/// Durable record of when the host last went idle. The file holds a single
/// ASCII float Unix timestamp; an empty file means the host is Active.
///
/// The monitor is the only writer. The status reporter reads it to show the
/// real accumulated idle duration.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the state directory. This is the one startup failure the
    /// monitor treats as fatal.
    pub fn ensure_dir(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }

    /// Load the persisted idle-since timestamp. Missing, empty, or corrupt
    /// content resets to Active: an unexplained gap must never be treated as
    /// "already idle forever".
    pub fn load(&self) -> Option<f64> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(
                    "failed to read idle state {}: {}, starting active",
                    self.path.display(),
                    e
                );
                return None;
            }
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<f64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                warn!(
                    "corrupt idle state {}: {:?}, starting active",
                    self.path.display(),
                    raw
                );
                None
            }
        }
    }

    pub fn save(&self, idle_since: Option<f64>) -> io::Result<()> {
        let contents = idle_since.map(|ts| ts.to_string()).unwrap_or_default();
        atomic_write(&self.path, contents.as_bytes())
    }
}

/// Outcome of one check cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Unchanged,
    /// Active -> Idling; the idle timer starts now.
    BecameIdle,
    /// Idling -> Active; reports how long the host had been idle.
    BecameActive { idle_secs: f64 },
    /// The idle timer crossed the wait threshold; the caller should trigger
    /// the suspend action and then call [`SuspendStateMachine::reset`].
    SuspendDue { idle_secs: f64 },
}

/// Owns the idle-duration timer. Active is `idle_since = None`, Idling is
/// `idle_since = Some(t0)`; suspension is a transient action, never a state.
pub struct SuspendStateMachine {
    store: StateStore,
    wait_secs: f64,
    idle_since: Option<f64>,
    dirty: bool,
}

impl SuspendStateMachine {
    /// Reload `idle_since` from disk so idle time accumulated before a
    /// crash or restart is preserved.
    pub fn load(store: StateStore, wait: Duration) -> Self {
        let idle_since = store.load();
        if let Some(t0) = idle_since {
            info!("resuming idle timer started at {}", format_ts(t0));
        }
        Self {
            store,
            wait_secs: wait.as_secs_f64(),
            idle_since,
            dirty: false,
        }
    }

    pub fn idle_since(&self) -> Option<f64> {
        self.idle_since
    }

    /// Advance the machine by one cycle. `verdict` is the combined idle
    /// verdict (all signals idle AND no active lease) at time `now`.
    pub fn step(&mut self, verdict: bool, now: f64) -> Transition {
        if self.dirty {
            // a previous persist failed; retry before anything else
            self.persist();
        }
        match (self.idle_since, verdict) {
            (None, false) => Transition::Unchanged,
            (None, true) => {
                self.idle_since = Some(now);
                self.persist();
                Transition::BecameIdle
            }
            (Some(t0), true) => {
                let idle_secs = now - t0;
                if idle_secs >= self.wait_secs {
                    Transition::SuspendDue { idle_secs }
                } else {
                    Transition::Unchanged
                }
            }
            (Some(t0), false) => {
                self.idle_since = None;
                self.persist();
                Transition::BecameActive {
                    idle_secs: now - t0,
                }
            }
        }
    }

    /// Clear the idle timer after a suspend attempt, whatever its outcome.
    /// An OS that refuses to suspend would otherwise be asked again every
    /// cycle.
    pub fn reset(&mut self) {
        self.idle_since = None;
        self.persist();
    }

    /// Best-effort write of the in-memory state, used on shutdown.
    pub fn flush(&mut self) {
        self.persist();
    }

    fn persist(&mut self) {
        match self.store.save(self.idle_since) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                self.dirty = true;
                warn!(
                    "failed to persist idle state to {}: {}, retrying next cycle",
                    self.store.path().display(),
                    e
                );
            }
        }
    }
}

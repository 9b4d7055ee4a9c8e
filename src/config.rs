use std::path::PathBuf;
use std::time::Duration;

/// Leases are capped at 24 hours; longer requests are clamped, not rejected.
pub const MAX_LEASE_SECS: i64 = 86_400;

/// Immutable runtime configuration, built once from CLI/env and passed by
/// reference to every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minutes of continuous idleness before the host is suspended.
    pub wait_minutes: u64,
    /// CPU must be at least this idle (percent) to count as idle.
    pub cpu_idle_threshold: f64,
    /// GPU utilization must be at most this (percent) to count as idle.
    pub gpu_usage_max: f64,
    /// Interval between monitor check cycles.
    pub check_interval: Duration,
    /// An established connection on this port counts as an SSH session.
    pub ssh_port: u16,
    /// Established connections on any of these ports count as API sessions.
    pub api_ports: Vec<u16>,
    /// Idle-state file, written only by the monitor.
    pub state_file: PathBuf,
    /// Stay-awake lease file, written only by the override service.
    pub lease_file: PathBuf,
}

impl Config {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_minutes * 60)
    }
}

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;

use crate::lease::LeaseStore;
use crate::persist::unix_now_f64;
use crate::state::StateStore;

/// Point-in-time view of the persisted coordination state, as rendered by
/// the read-only reporter. Collected from the same two files the monitor
/// and the override service write; nothing here is re-derived.
#[derive(Debug, Serialize)]
pub struct PowerStatus {
    pub stay_awake_active: bool,
    pub stay_awake_remaining_secs: i64,
    /// Unix timestamp the current idle run started at, if the host is Idling.
    pub idle_since: Option<f64>,
    pub idle_secs: Option<i64>,
    /// Seconds until the monitor will suspend, assuming the signals stay idle.
    pub suspend_in_secs: Option<i64>,
}

impl PowerStatus {
    pub fn collect(state_file: &Path, lease_file: &Path, wait: Duration) -> Self {
        Self::collect_at(state_file, lease_file, wait, unix_now_f64())
    }

    pub fn collect_at(state_file: &Path, lease_file: &Path, wait: Duration, now: f64) -> Self {
        let lease = LeaseStore::new(lease_file);
        let stay_awake_active = lease.is_active_at(now as i64);
        let stay_awake_remaining_secs = lease.remaining_at(now as i64);

        let idle_since = StateStore::new(state_file).load();
        let idle_secs = idle_since.map(|t0| (now - t0).max(0.0) as i64);
        let suspend_in_secs = idle_secs.map(|idle| (wait.as_secs() as i64 - idle).max(0));

        Self {
            stay_awake_active,
            stay_awake_remaining_secs,
            idle_since,
            idle_secs,
            suspend_in_secs,
        }
    }

    pub fn render_human(&self) -> String {
        let mut out = String::new();
        if self.stay_awake_active {
            out.push_str(&format!(
                "stay-awake: {} ({} remaining)\n",
                "active".green().bold(),
                format_hms(self.stay_awake_remaining_secs)
            ));
        } else {
            out.push_str(&format!("stay-awake: {}\n", "inactive".dimmed()));
        }

        match (self.idle_since, self.idle_secs, self.suspend_in_secs) {
            (Some(t0), Some(idle), Some(eta)) => {
                out.push_str(&format!(
                    "idle since: {} ({} ago)\n",
                    format_ts(t0),
                    format_hms(idle)
                ));
                if self.stay_awake_active {
                    out.push_str(&format!(
                        "suspend: {} by stay-awake lease\n",
                        "blocked".yellow()
                    ));
                } else {
                    out.push_str(&format!("suspend in: {}\n", format_hms(eta)));
                }
            }
            _ => out.push_str("idle: no (host considered active)\n"),
        }
        out
    }
}

/// "1h 2m 3s" style breakdown; hours and minutes are always shown so the
/// output lines up across readings.
pub fn format_hms(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Compact duration used in grant confirmations: "2h 5m" or "45m".
pub fn format_grant(secs: i64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Local-time rendering of a Unix timestamp for logs and status output.
pub fn format_ts(ts: f64) -> String {
    DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| format!("@{ts}"))
}

use std::fmt;

use tracing::warn;

use crate::config::Config;
use crate::stats::StatsProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Signal is idle when value >= threshold (e.g. CPU idle percentage).
    AtLeast,
    /// Signal is idle when value <= threshold (e.g. GPU usage, session counts).
    AtMost,
}

impl Comparator {
    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::AtLeast => value >= threshold,
            Comparator::AtMost => value <= threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::AtLeast => write!(f, ">="),
            Comparator::AtMost => write!(f, "<="),
        }
    }
}

/// One monitored dimension and its verdict for the current cycle.
#[derive(Debug, Clone)]
pub struct IdleSignal {
    pub name: &'static str,
    /// Raw sampled value; `None` when the probe failed this cycle.
    pub value: Option<f64>,
    pub threshold: f64,
    pub comparator: Comparator,
    pub satisfied: bool,
}

impl IdleSignal {
    fn sampled(name: &'static str, value: f64, threshold: f64, comparator: Comparator) -> Self {
        Self {
            name,
            value: Some(value),
            threshold,
            comparator,
            satisfied: comparator.holds(value, threshold),
        }
    }

    /// A failed probe counts as busy: when in doubt, stay awake.
    fn degraded(name: &'static str, threshold: f64, comparator: Comparator) -> Self {
        Self {
            name,
            value: None,
            threshold,
            comparator,
            satisfied: false,
        }
    }
}

impl fmt::Display for IdleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(
                f,
                "{}={:.1} (need {}{})",
                self.name, value, self.comparator, self.threshold
            ),
            None => write!(
                f,
                "{}=unavailable (need {}{})",
                self.name, self.comparator, self.threshold
            ),
        }
    }
}

/// Per-signal verdicts for one check cycle.
#[derive(Debug, Clone)]
pub struct IdleReport {
    pub signals: Vec<IdleSignal>,
}

impl IdleReport {
    /// True iff every required signal is satisfied. The stay-awake lease is
    /// combined with this by the caller, not here.
    pub fn all_idle(&self) -> bool {
        self.signals.iter().all(|s| s.satisfied)
    }

    /// One-line per-cycle summary for the monitor log.
    pub fn summary(&self) -> String {
        self.signals
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Samples the stats provider and turns raw values into per-signal verdicts.
pub struct IdleDetector {
    cpu_idle_threshold: f64,
    gpu_usage_max: f64,
    ssh_port: u16,
    api_ports: Vec<u16>,
}

impl IdleDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            cpu_idle_threshold: config.cpu_idle_threshold,
            gpu_usage_max: config.gpu_usage_max,
            ssh_port: config.ssh_port,
            api_ports: config.api_ports.clone(),
        }
    }

    pub fn sample(&self, provider: &mut dyn StatsProvider) -> IdleReport {
        let cpu = match provider.cpu_idle_percent() {
            Ok(value) => {
                IdleSignal::sampled("cpu_idle", value, self.cpu_idle_threshold, Comparator::AtLeast)
            }
            Err(e) => {
                warn!("cpu probe failed: {}", e);
                IdleSignal::degraded("cpu_idle", self.cpu_idle_threshold, Comparator::AtLeast)
            }
        };

        let gpu = match provider.gpu_util_percent() {
            Ok(value) => {
                IdleSignal::sampled("gpu_usage", value, self.gpu_usage_max, Comparator::AtMost)
            }
            Err(e) => {
                warn!("gpu probe failed: {}", e);
                IdleSignal::degraded("gpu_usage", self.gpu_usage_max, Comparator::AtMost)
            }
        };

        let (ssh, api) = match provider.established_ports() {
            Ok(ports) => {
                let ssh_sessions = u32::from(ports.contains(&self.ssh_port)) as f64;
                let api_sessions = self
                    .api_ports
                    .iter()
                    .filter(|p| ports.contains(p))
                    .count() as f64;
                (
                    IdleSignal::sampled("ssh_sessions", ssh_sessions, 0.0, Comparator::AtMost),
                    IdleSignal::sampled("api_sessions", api_sessions, 0.0, Comparator::AtMost),
                )
            }
            Err(e) => {
                warn!("connection probe failed: {}", e);
                (
                    IdleSignal::degraded("ssh_sessions", 0.0, Comparator::AtMost),
                    IdleSignal::degraded("api_sessions", 0.0, Comparator::AtMost),
                )
            }
        };

        IdleReport {
            signals: vec![cpu, gpu, ssh, api],
        }
    }
}

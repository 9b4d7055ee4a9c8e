use std::collections::HashSet;
use std::io::ErrorKind;
use std::process::Command;

use sysinfo::{CpuExt, System, SystemExt};
use tracing::debug;

use crate::error::SamplingError;

/// Raw signal sources consumed by the idle detector.
///
/// One method per signal, so a failing probe degrades only the signal it
/// feeds and the others still get fresh values.
pub trait StatsProvider {
    /// Percentage of CPU time spent idle since the previous sample.
    fn cpu_idle_percent(&mut self) -> Result<f64, SamplingError>;

    /// GPU utilization percentage; 0.0 on hosts without an NVIDIA GPU.
    fn gpu_util_percent(&mut self) -> Result<f64, SamplingError>;

    /// Local and peer ports of every established TCP connection.
    fn established_ports(&mut self) -> Result<HashSet<u16>, SamplingError>;
}

/// Live implementation: `sysinfo` for CPU, `nvidia-smi` for GPU, `ss -tna`
/// for connections.
pub struct SystemStats {
    sys: System,
}

impl SystemStats {
    pub fn new() -> Self {
        let mut sys = System::new();
        // prime the counters; cpu usage is a delta between two refreshes
        sys.refresh_cpu();
        Self { sys }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsProvider for SystemStats {
    fn cpu_idle_percent(&mut self) -> Result<f64, SamplingError> {
        self.sys.refresh_cpu();
        let usage = self.sys.global_cpu_info().cpu_usage() as f64;
        Ok((100.0 - usage).clamp(0.0, 100.0))
    }

    fn gpu_util_percent(&mut self) -> Result<f64, SamplingError> {
        let output = match Command::new("nvidia-smi")
            .args(["--query-gpu=utilization.gpu", "--format=csv,noheader,nounits"])
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // no nvidia-smi on the host: nothing to keep awake
                debug!("nvidia-smi not found, reporting 0% gpu utilization");
                return Ok(0.0);
            }
            Err(e) => return Err(SamplingError::Io(e)),
        };
        if !output.status.success() {
            debug!("nvidia-smi exited with {}, reporting 0%", output.status);
            return Ok(0.0);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout.lines().next().unwrap_or("").trim();
        first
            .parse::<f64>()
            .map_err(|_| SamplingError::Parse(format!("nvidia-smi output {:?}", first)))
    }

    fn established_ports(&mut self) -> Result<HashSet<u16>, SamplingError> {
        let output = Command::new("ss").args(["-tna"]).output()?;
        if !output.status.success() {
            return Err(SamplingError::Parse(format!(
                "ss exited with {}",
                output.status
            )));
        }
        Ok(parse_established_ports(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// Extract every port (local or peer) appearing in an ESTAB row of
/// `ss -tna` output.
fn parse_established_ports(raw: &str) -> HashSet<u16> {
    let mut ports = HashSet::new();
    for line in raw.lines() {
        if !line.contains("ESTAB") {
            continue;
        }
        for field in line.split_whitespace() {
            if let Some(idx) = field.rfind(':') {
                if let Ok(port) = field[idx + 1..].parse::<u16>() {
                    ports.insert(port);
                }
            }
        }
    }
    ports
}

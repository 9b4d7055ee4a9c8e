use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::Config;

pub const DEFAULT_STATE_FILE: &str = "/var/lib/idlewatch/idle_since";
pub const DEFAULT_LEASE_FILE: &str = "/run/idlewatch/stay_awake_until";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "idlewatch",
    about = "Monitor system activity and suspend the host when idle for too long"
)]
pub struct MonitorArgs {
    /// Minutes of continuous idleness before the host is suspended
    #[arg(long, env = "WAIT_MINUTES", default_value_t = 30)]
    pub wait_minutes: u64,

    /// CPU must be at least this idle (percent) to count as an idle signal
    #[arg(long, env = "CPU_IDLE_THRESHOLD", default_value_t = 90.0)]
    pub cpu_idle_threshold: f64,

    /// GPU utilization must be at most this (percent) to count as an idle signal
    #[arg(long, env = "GPU_USAGE_MAX", default_value_t = 10.0)]
    pub gpu_usage_max: f64,

    /// Seconds between check cycles
    #[arg(long, env = "CHECK_INTERVAL", default_value_t = 60)]
    pub check_interval: u64,

    /// TCP port counted as SSH traffic
    #[arg(long, default_value_t = 22)]
    pub ssh_port: u16,

    /// TCP ports counted as API traffic; an established connection on any of
    /// them keeps the host awake (can be specified multiple times)
    #[arg(long = "api-port", default_values_t = [8080u16, 11434, 3000])]
    pub api_ports: Vec<u16>,

    /// Idle-state file written by the monitor
    #[arg(long, env = "IDLEWATCH_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Stay-awake lease file written by the override service
    #[arg(long, env = "STAY_AWAKE_FILE", default_value = DEFAULT_LEASE_FILE)]
    pub lease_file: PathBuf,

    /// Directory for rolling log files. Defaults to $HOME/.idlewatch
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging for idlewatch modules
    #[arg(long)]
    pub debug: bool,
}

impl MonitorArgs {
    pub fn config(&self) -> Config {
        Config {
            wait_minutes: self.wait_minutes,
            cpu_idle_threshold: self.cpu_idle_threshold,
            gpu_usage_max: self.gpu_usage_max,
            check_interval: Duration::from_secs(self.check_interval),
            ssh_port: self.ssh_port,
            api_ports: self.api_ports.clone(),
            state_file: self.state_file.clone(),
            lease_file: self.lease_file.clone(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "idlewatch-stayawake",
    about = "HTTP endpoint that lets remote clients veto auto-suspend for a bounded time"
)]
pub struct StayAwakeArgs {
    /// Port to run the stay-awake server on
    #[arg(short = 'p', long, env = "STAY_AWAKE_PORT", default_value_t = 9876)]
    pub port: u16,

    /// Stay-awake lease file this service writes
    #[arg(long, env = "STAY_AWAKE_FILE", default_value = DEFAULT_LEASE_FILE)]
    pub lease_file: PathBuf,

    /// Enable debug logging for idlewatch modules
    #[arg(long)]
    pub debug: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "idlewatch-status",
    about = "Read-only view of the auto-suspend state shared by the monitor and the override service"
)]
pub struct StatusArgs {
    /// Minutes of continuous idleness before the host is suspended; used to
    /// compute the projected suspend time
    #[arg(long, env = "WAIT_MINUTES", default_value_t = 30)]
    pub wait_minutes: u64,

    /// Idle-state file written by the monitor
    #[arg(long, env = "IDLEWATCH_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Stay-awake lease file written by the override service
    #[arg(long, env = "STAY_AWAKE_FILE", default_value = DEFAULT_LEASE_FILE)]
    pub lease_file: PathBuf,

    /// Emit machine-readable JSON instead of human text
    #[arg(long)]
    pub json: bool,
}

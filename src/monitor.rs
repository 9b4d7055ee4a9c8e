use std::process::Command;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::config::Config;
use crate::detector::IdleDetector;
use crate::error::SuspendActionError;
use crate::lease::LeaseStore;
use crate::persist::unix_now_f64;
use crate::state::{StateStore, SuspendStateMachine, Transition};
use crate::stats::StatsProvider;

/// The OS-level call that puts the machine to sleep.
pub trait SuspendAction {
    fn trigger(&mut self) -> Result<(), SuspendActionError>;
}

/// Suspends through systemd. Blocks the cycle for at most `timeout`; an OS
/// that hangs on the request gets its command killed.
pub struct SystemdSuspend {
    timeout: Duration,
}

impl SystemdSuspend {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SystemdSuspend {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendAction for SystemdSuspend {
    fn trigger(&mut self) -> Result<(), SuspendActionError> {
        let mut child = Command::new("systemctl").arg("suspend").spawn()?;
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait()? {
                Some(status) if status.success() => return Ok(()),
                Some(status) => return Err(SuspendActionError::Failed(status)),
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    return Err(SuspendActionError::Timeout(self.timeout));
                }
                None => std::thread::sleep(Duration::from_millis(100)),
            }
        }
    }
}

/// Fixed-interval driver composing the detector, the lease store, and the
/// suspend state machine. Single-threaded; all cross-process coordination
/// goes through the two persisted files.
pub struct Monitor {
    config: Config,
    detector: IdleDetector,
    provider: Box<dyn StatsProvider + Send>,
    lease: LeaseStore,
    machine: SuspendStateMachine,
    action: Box<dyn SuspendAction + Send>,
}

impl Monitor {
    pub fn new(
        config: Config,
        provider: Box<dyn StatsProvider + Send>,
        action: Box<dyn SuspendAction + Send>,
    ) -> anyhow::Result<Self> {
        let store = StateStore::new(&config.state_file);
        store.ensure_dir()?;
        let machine = SuspendStateMachine::load(store, config.wait());
        Ok(Self {
            detector: IdleDetector::new(&config),
            lease: LeaseStore::new(&config.lease_file),
            config,
            provider,
            machine,
            action,
        })
    }

    pub fn idle_since(&self) -> Option<f64> {
        self.machine.idle_since()
    }

    /// One sample -> verdict -> transition pass at time `now` (Unix
    /// seconds). Nothing in here is fatal; a died-and-restarted process
    /// recomputes from the last persisted state.
    pub fn run_cycle(&mut self, now: f64) {
        let report = self.detector.sample(self.provider.as_mut());
        let stay_awake = self.lease.is_active_at(now as i64);
        let verdict = report.all_idle() && !stay_awake;

        info!("check: {}, stay_awake={}", report.summary(), stay_awake);
        if stay_awake {
            info!(
                "stay-awake active: {}s remaining",
                self.lease.remaining_at(now as i64)
            );
        }

        match self.machine.step(verdict, now) {
            Transition::Unchanged => {
                if let Some(t0) = self.machine.idle_since() {
                    info!(
                        "system idle for {:.1} minutes (threshold: {} minutes)",
                        (now - t0) / 60.0,
                        self.config.wait_minutes
                    );
                }
            }
            Transition::BecameIdle => info!("system became idle"),
            Transition::BecameActive { idle_secs } => info!(
                "system became active after {:.1} minutes of idle",
                idle_secs / 60.0
            ),
            Transition::SuspendDue { idle_secs } => {
                info!(
                    "idle threshold reached after {:.1} minutes - suspending system",
                    idle_secs / 60.0
                );
                if let Err(e) = self.action.trigger() {
                    // reset anyway; retrying every cycle would hammer an OS
                    // that just declined to sleep
                    error!("suspend failed: {}", e);
                }
                self.machine.reset();
            }
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("starting auto-suspend monitor");
        info!(
            "configuration: wait={}m, cpu_idle>={}%, gpu_usage<={}%, interval={}s",
            self.config.wait_minutes,
            self.config.cpu_idle_threshold,
            self.config.gpu_usage_max,
            self.config.check_interval.as_secs()
        );

        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle(unix_now_f64()),
                _ = &mut shutdown => {
                    info!("shutdown requested, flushing idle state");
                    self.machine.flush();
                    return Ok(());
                }
            }
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

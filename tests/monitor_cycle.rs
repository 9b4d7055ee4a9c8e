use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use idlewatch::{
    Config, LeaseStore, Monitor, SamplingError, StatsProvider, SuspendAction, SuspendActionError,
};

/// Scripted provider: each cycle reports either a fully idle or a fully busy
/// system.
struct ScriptedStats {
    idle: bool,
}

impl StatsProvider for ScriptedStats {
    fn cpu_idle_percent(&mut self) -> Result<f64, SamplingError> {
        Ok(if self.idle { 99.0 } else { 20.0 })
    }

    fn gpu_util_percent(&mut self) -> Result<f64, SamplingError> {
        Ok(0.0)
    }

    fn established_ports(&mut self) -> Result<HashSet<u16>, SamplingError> {
        Ok(HashSet::new())
    }
}

struct CountingSuspend {
    invocations: Arc<AtomicUsize>,
    fail: bool,
}

impl SuspendAction for CountingSuspend {
    fn trigger(&mut self) -> Result<(), SuspendActionError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(SuspendActionError::Timeout(Duration::from_secs(10)))
        } else {
            Ok(())
        }
    }
}

fn config(dir: &Path, wait_minutes: u64) -> Config {
    Config {
        wait_minutes,
        cpu_idle_threshold: 90.0,
        gpu_usage_max: 10.0,
        check_interval: Duration::from_secs(1),
        ssh_port: 22,
        api_ports: vec![8080, 11434, 3000],
        state_file: dir.join("idle_since"),
        lease_file: dir.join("stay_awake_until"),
    }
}

fn monitor(dir: &Path, wait_minutes: u64, idle: bool, counter: Arc<AtomicUsize>) -> Monitor {
    monitor_with(dir, wait_minutes, idle, counter, false)
}

fn monitor_with(
    dir: &Path,
    wait_minutes: u64,
    idle: bool,
    counter: Arc<AtomicUsize>,
    fail_suspend: bool,
) -> Monitor {
    Monitor::new(
        config(dir, wait_minutes),
        Box::new(ScriptedStats { idle }),
        Box::new(CountingSuspend {
            invocations: counter,
            fail: fail_suspend,
        }),
    )
    .unwrap()
}

#[test]
fn sixty_one_idle_seconds_suspend_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let suspends = Arc::new(AtomicUsize::new(0));
    let mut m = monitor(dir.path(), 1, true, suspends.clone());

    // wait_minutes=1, check_interval=1s: one simulated cycle per second
    for i in 0..61 {
        m.run_cycle(i as f64);
    }

    assert_eq!(suspends.load(Ordering::SeqCst), 1);
    // idle timer cleared immediately after the suspend call
    assert_eq!(m.idle_since(), None);
}

#[test]
fn suspend_fires_once_per_idle_run_not_once_per_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let suspends = Arc::new(AtomicUsize::new(0));
    let mut m = monitor(dir.path(), 1, true, suspends.clone());

    // long enough for two full runs: the timer restarts after each suspend
    for i in 0..130 {
        m.run_cycle(i as f64);
    }

    assert_eq!(suspends.load(Ordering::SeqCst), 2);
}

#[test]
fn busy_system_never_suspends() {
    let dir = tempfile::tempdir().unwrap();
    let suspends = Arc::new(AtomicUsize::new(0));
    let mut m = monitor(dir.path(), 1, false, suspends.clone());

    for i in 0..200 {
        m.run_cycle(i as f64);
    }

    assert_eq!(suspends.load(Ordering::SeqCst), 0);
    assert_eq!(m.idle_since(), None);
}

#[test]
fn granting_a_lease_flips_the_verdict_on_the_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let suspends = Arc::new(AtomicUsize::new(0));
    let mut m = monitor(dir.path(), 30, true, suspends.clone());

    m.run_cycle(0.0);
    m.run_cycle(1.0);
    assert_eq!(m.idle_since(), Some(0.0));

    // no underlying signal changes, only the lease
    LeaseStore::new(dir.path().join("stay_awake_until"))
        .grant_at(1, 600)
        .unwrap();

    m.run_cycle(2.0);
    assert_eq!(m.idle_since(), None);
    assert_eq!(suspends.load(Ordering::SeqCst), 0);
}

#[test]
fn expired_lease_lets_the_idle_timer_restart_and_is_reaped() {
    let dir = tempfile::tempdir().unwrap();
    let lease_path = dir.path().join("stay_awake_until");
    let suspends = Arc::new(AtomicUsize::new(0));
    let mut m = monitor(dir.path(), 30, true, suspends.clone());

    LeaseStore::new(&lease_path).grant_at(0, 10).unwrap();

    m.run_cycle(5.0);
    assert_eq!(m.idle_since(), None);

    m.run_cycle(11.0);
    assert_eq!(m.idle_since(), Some(11.0));
    // the monitor reaped the expired lease file on read
    assert!(!lease_path.exists());
}

#[test]
fn restart_mid_idle_resumes_from_the_original_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let suspends = Arc::new(AtomicUsize::new(0));

    let mut m = monitor(dir.path(), 1, true, suspends.clone());
    m.run_cycle(100.0);
    m.run_cycle(130.0);
    assert_eq!(m.idle_since(), Some(100.0));
    drop(m);

    let mut resumed = monitor(dir.path(), 1, true, suspends.clone());
    assert_eq!(resumed.idle_since(), Some(100.0));

    // 60 idle seconds total, counted from before the restart
    resumed.run_cycle(160.0);
    assert_eq!(suspends.load(Ordering::SeqCst), 1);
    assert_eq!(resumed.idle_since(), None);
}

#[test]
fn failed_suspend_still_resets_the_idle_timer() {
    let dir = tempfile::tempdir().unwrap();
    let suspends = Arc::new(AtomicUsize::new(0));
    let mut m = monitor_with(dir.path(), 1, true, suspends.clone(), true);

    for i in 0..=60 {
        m.run_cycle(i as f64);
    }
    assert_eq!(suspends.load(Ordering::SeqCst), 1);
    assert_eq!(m.idle_since(), None);

    // the next cycle starts a fresh run instead of retrying immediately
    m.run_cycle(61.0);
    assert_eq!(m.idle_since(), Some(61.0));
    assert_eq!(suspends.load(Ordering::SeqCst), 1);
}

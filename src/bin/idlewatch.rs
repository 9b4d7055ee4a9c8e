use std::env;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use dirs::home_dir;
use idlewatch::cli::MonitorArgs;
use idlewatch::{Monitor, SystemStats, SystemdSuspend};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn log_dir(args: &MonitorArgs) -> anyhow::Result<PathBuf> {
    let default_dir = home_dir()
        .ok_or_else(|| anyhow::anyhow!("failed to get home directory"))?
        .join(".idlewatch");
    let dir = args.log_dir.clone().unwrap_or(default_dir);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn setup_logging(args: &MonitorArgs) -> anyhow::Result<WorkerGuard> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("idlewatch")
        .filename_suffix("log")
        .max_log_files(5)
        .build(log_dir(args)?)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);

    for directive in env::var("IDLEWATCH_LOG")
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
    {
        match directive.parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(e) => eprintln!("warning: invalid log directive '{}': {}", directive, e),
        }
    }

    if args.debug {
        env_filter = env_filter.add_directive("idlewatch=debug".parse()?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = MonitorArgs::parse();
    let _guard = setup_logging(&args)?;

    let monitor = Monitor::new(
        args.config(),
        Box::new(SystemStats::new()),
        Box::new(SystemdSuspend::new()),
    )?;
    monitor.run().await
}

use std::net::SocketAddr;

use clap::Parser;
use idlewatch::cli::StayAwakeArgs;
use idlewatch::{LeaseStore, Server};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn setup_logging(debug: bool) -> anyhow::Result<()> {
    let mut env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    if debug {
        env_filter = env_filter.add_directive("idlewatch=debug".parse()?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = StayAwakeArgs::parse();
    setup_logging(args.debug)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let server = Server::new(LeaseStore::new(&args.lease_file), addr);
    server.start().await?;
    Ok(())
}

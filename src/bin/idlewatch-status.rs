use std::time::Duration;

use clap::Parser;
use idlewatch::cli::StatusArgs;
use idlewatch::PowerStatus;

fn main() -> anyhow::Result<()> {
    let args = StatusArgs::parse();

    let wait = Duration::from_secs(args.wait_minutes * 60);
    let status = PowerStatus::collect(&args.state_file, &args.lease_file, wait);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", status.render_human());
    }
    Ok(())
}

pub mod cli;
mod config;
mod detector;
mod error;
mod lease;
mod monitor;
mod persist;
mod server;
mod state;
mod stats;
mod status;

pub use config::{Config, MAX_LEASE_SECS};
pub use detector::{Comparator, IdleDetector, IdleReport, IdleSignal};
pub use error::{LeaseError, SamplingError, SuspendActionError};
pub use lease::LeaseStore;
pub use monitor::{Monitor, SuspendAction, SystemdSuspend};
pub use server::{create_router, AppState, Server};
pub use state::{StateStore, SuspendStateMachine, Transition};
pub use stats::{StatsProvider, SystemStats};
pub use status::PowerStatus;

//! Spaceframe sandbox
//!
//! Builds a star, an orbiting planet with its own coordinate space, and a
//! swarm of ships near the planet. Each step the planet's space moves along
//! its orbit, ships drift by their velocity, and a few ships hop between the
//! planet's space and the star's space.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p spaceframe-sandbox -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--ships <N>`: Number of ships (default: 16)
//! - `--steps <N>`: Number of simulation steps (default: 100)
//! - `--dt <SECONDS>`: Step length in seconds (default: 60)
//! - `--root-precision <N>`: Precision of the star's space (default: 10)
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod scenario;

use tracing_subscriber::EnvFilter;

use crate::scenario::{Scenario, ScenarioParams};

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let params = ScenarioParams::from_args();
    tracing::info!(?params, "Starting sandbox");

    let mut scenario = Scenario::new(&params)?;
    for _ in 0..params.steps {
        scenario.step()?;
    }
    scenario.report()?;
    Ok(())
}

fn print_help() {
    eprintln!(
        "Spaceframe sandbox

USAGE:
    cargo run -p spaceframe-sandbox -- [OPTIONS]

OPTIONS:
    --ships <N>             Number of ships (default: 16)
    --steps <N>             Number of simulation steps (default: 100)
    --dt <SECONDS>          Step length in seconds (default: 60)
    --root-precision <N>    Precision of the star's space, 2^N units per meter (default: 10)
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}

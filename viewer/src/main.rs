//! Life Viewer
//!
//! Headless driver for the governed render loop. Runs a scripted session on a
//! virtual display and prints the session summary as JSON.
//!
//! Usage: lifeview [CONFIG_JSON] [SCENARIO_JSON]

mod commands;
mod host;
mod renderer;
mod scenario;
mod state;
mod universe;

use governor::ViewerConfig;
use scenario::Scenario;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ViewerConfig::load(&path)?,
        None => ViewerConfig::default(),
    };
    let scenario = match args.next() {
        Some(path) => Scenario::load(&path)?,
        None => Scenario::default(),
    };

    let mut state = scenario.build_state(config)?;
    let active = commands::config::get_config(&state);
    info!(
        initial_speed = active.governor.initial_speed,
        size_limit = active.governor.initial_size_limit,
        frames = scenario.frames,
        "Life viewer starting..."
    );

    let start = std::time::Instant::now();
    let summary = scenario.run(&mut state)?;
    info!(
        "Session complete: {:?} wall time, {} ticks over {} frames, {} notices",
        start.elapsed(),
        summary.ticks,
        summary.frames,
        summary.notices.len()
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

//! # EMBER Demo
//!
//! Drives the process-wide engine headlessly and prints the final profile.
//!
//! ```text
//! ember_demo [config.toml] [frames]
//! ```
//!
//! Halfway through, the demo raises a reset and requests a resize in the
//! same tick: that cycle is skipped and the resize lands on the next one.

use std::process::ExitCode;

use ember::render::synthetic_workload;
use ember::{init_logging, ControlSurface, EngineConfig};

const DEFAULT_FRAMES: u64 = 240;
const WORKLOAD_ITEMS: usize = 20_000;
const WORKLOAD_SEED: u64 = 0x00E3_BE12;

fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match EngineConfig::from_toml_file(&path) {
            Ok(config) => config,
            Err(error) => {
                tracing::error!(%error, "cannot load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    let frames = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let surface = ControlSurface::global();
    if !surface.initialize_with(config) {
        return ExitCode::FAILURE;
    }
    surface.set_workload(synthetic_workload(WORKLOAD_ITEMS, WORKLOAD_SEED));

    tracing::info!(threads = surface.thread_count(), frames, "demo started");

    for frame in 0..frames {
        if frame == frames / 2 {
            surface.signal_reset();
            surface.resize(1280, 720);
        }
        surface.update();
        surface.render();
    }

    let snapshot = surface.snapshot();
    println!("{}\n\n{}", snapshot.cpu, snapshot.gpu);
    tracing::info!(
        presented = surface.frames_presented(),
        requested = frames,
        "demo finished"
    );

    surface.shutdown();
    ExitCode::SUCCESS
}

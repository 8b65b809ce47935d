//! `refills-cli` – REFILLS Shelf Scanning Command Line Interface
//!
//! This binary runs one shop scan end to end.  It:
//!
//! 1. Loads `~/.refills/config.toml` (writing the defaults on first run) and
//!    applies `REFILLS_*` environment overrides.
//! 2. Refuses to run unless `simulate_robot` is set, since the only drivers
//!    shipped are the simulated ones.  Then connects to the knowledge store
//!    through rosbridge.
//! 3. Installs a **Ctrl-C** handler that stops the robot and exits.
//! 4. Asks the operator to start the demo and runs the scan, with every
//!    checkpoint prompted on the console.
//! 5. Saves the belief state and action graph into the configured data
//!    directory.

mod config;
mod console;

use std::process::ExitCode;
use std::time::Duration;

use colored::Colorize;
use refills_hal::sim::SimRobot;
use refills_kernel::SafetyGate;
use refills_knowledge::{BarcodeMeshMap, KnowRob};
use refills_middleware::JsonPrologService;
use refills_runtime::{Cram, init_tracing};
use refills_types::RefillsError;
use tracing::{info, warn};

use crate::config::Config;
use crate::console::ConsoleOperator;

fn main() -> ExitCode {
    let _telemetry = init_tracing("refills");

    print_banner();

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cfg) {
        Ok(()) => {
            println!("{}", "  ✓ Scan finished.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Scan failed".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<Config, RefillsError> {
    match config::load()? {
        Some(cfg) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            Ok(cfg)
        }
        None => {
            let mut cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  Default config written to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

/// Refuse to touch the knowledge store unless the operator opted into the
/// simulated drivers.
fn check_drivers(cfg: &Config) -> Result<(), RefillsError> {
    if cfg.simulate_robot {
        Ok(())
    } else {
        Err(RefillsError::Config(
            "no robot drivers available; set simulate_robot = true (or REFILLS_SIMULATE_ROBOT=true) \
             to run against the simulated base, arm and perception"
                .to_string(),
        ))
    }
}

fn run(cfg: &Config) -> Result<(), RefillsError> {
    check_drivers(cfg)?;
    println!(
        "  {}",
        "Simulated base, arm and perception; only the knowledge store is live.".yellow()
    );
    let sim = SimRobot::new();
    let robot = sim.robot();

    print!("  Connecting to knowledge store at {} … ", cfg.rosbridge_url.dimmed());
    let store = JsonPrologService::connect(
        &cfg.rosbridge_url,
        Duration::from_secs(cfg.query_timeout_secs),
    )
    .map_err(|e| {
        println!("{}", "offline".yellow());
        RefillsError::Knowledge(e.to_string())
    })?;
    println!("{}", "online".green());

    let kb = KnowRob::new(Box::new(store), robot.frames.clone());
    let gate = SafetyGate::new(Box::new(ConsoleOperator::stdio()));
    let mut cram = Cram::new(robot, kb, gate, cfg.scan_config())?;
    if let Some(path) = &cfg.barcode_mesh_path {
        cram = cram.with_barcode_meshes(BarcodeMeshMap::load(path)?);
    }

    let estop = cram.emergency_stop();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        estop.trigger();
        println!("{}", "  ✓ Base stopped and arm goals cancelled.".green());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not stop the robot");
    }

    let result = cram.run_demo();

    info!(dir = %cfg.data_dir.display(), "saving results");
    if let Err(e) = cram.save_results(&cfg.data_dir) {
        warn!(error = %e, "failed to save results");
    }
    result
}

fn print_banner() {
    println!();
    println!("{}", "  REFILLS shelf scanner".bold().cyan());
    println!(
        "  {} v{}",
        "refills".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

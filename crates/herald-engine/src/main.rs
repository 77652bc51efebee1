//! Simulation binary for the Herald disaster-response agents.
//!
//! This is the entry point that wires together configuration, logging,
//! the responder scenario, and the run loop, then writes the message log.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument, or
//!    `herald.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the `scenario` section and assemble the participants
//! 4. Run the simulation loop until it ends or Ctrl-C arrives
//! 5. Log the result and the message statistics
//! 6. Write the JSON message log when a path is configured

mod error;
mod scenario;
mod scenario_callback;

use std::path::{Path, PathBuf};

use herald_core::{LoggingConfig, SimulationConfig, log_simulation_end, run_simulation};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scenario::{build_scenario, load_scenario_config};
use crate::scenario_callback::ScenarioCallback;

/// Config file used when no path is given.
const DEFAULT_CONFIG_PATH: &str = "herald.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step, the simulation itself, or
/// the report write fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("herald-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        name = %config.simulation.name,
        seed = config.simulation.seed,
        max_ticks = config.simulation.max_ticks,
        tick_interval_ms = config.simulation.tick_interval_ms,
        ontology = %config.messaging.ontology,
        "Simulation configured"
    );

    // 3. Assemble the scenario.
    let scenario_config = load_scenario_config(&config_path)?;
    let seed = config.simulation.seed;
    let scenario = build_scenario(&scenario_config, &config.messaging.tags(), seed)?;
    let mut callback = ScenarioCallback::new(&scenario_config, &scenario, seed);
    let mut simulation = scenario.simulation;

    // 4. Run the simulation.
    let outcome = tokio::select! {
        result = run_simulation(&mut simulation, &config.simulation, &mut callback) => {
            Some(result.map_err(EngineError::from)?)
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Interrupted, shutting down");
            None
        }
    };

    // 5. Log results.
    if let Some(result) = &outcome {
        log_simulation_end(result);
    }
    let stats = simulation.message_log().statistics();
    let routing = simulation.routing_stats();
    info!(
        ticks = simulation.tick(),
        messages = stats.total_messages,
        conversations = stats.conversations,
        delivered = routing.delivered,
        dropped = routing.dropped,
        "Message statistics"
    );
    for line in stats.to_string().lines() {
        info!("{line}");
    }
    for participant in simulation.participants() {
        info!(
            agent = %participant.participant_id(),
            state = %participant.state_label(),
            transitions = participant.transition_count(),
            "Final state"
        );
    }

    // 6. Write the message log.
    if let Some(path) = &config.report.message_log_path {
        write_message_log(&simulation, path).await?;
        info!(path = %path.display(), "Message log written");
    }

    info!("herald-engine shutdown complete");
    Ok(())
}

/// Load configuration from `path`, or the defaults when the file does not
/// exist. The flag tells whether the file was read.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok((config, false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn write_message_log(simulation: &herald_core::Simulation, path: &Path) -> Result<(), EngineError> {
    let json = simulation.message_log().to_json()?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

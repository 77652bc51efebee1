//! Cooperative stepper and run loop for the Herald simulation.
//!
//! A single [`Simulation`] owns every participant in a fixed order. Each
//! tick routes all pending messages, then updates each participant once.
//! Nothing suspends inside a tick; the run loop only awaits the optional
//! pacing delay between ticks.
//!
//! # Modules
//!
//! - [`config`] -- YAML [`SimulationConfig`] with defaults and overrides
//! - [`runner`] -- [`run_simulation`] with tick limit, quiescence, and
//!   callback stop
//! - [`tick`] -- [`Simulation`] and [`TickSummary`]

pub mod config;
pub mod runner;
pub mod tick;

pub use config::{
    ConfigError, LoggingConfig, MESSAGE_LOG_ENV, MessagingConfig, ReportConfig, SimulationConfig,
    SimulationSection,
};
pub use runner::{
    NoOpCallback, RunnerError, SimulationEndReason, SimulationResult, TickCallback, TickControl,
    log_simulation_end, run_simulation,
};
pub use tick::{AgentSnapshot, Simulation, TickError, TickSummary};

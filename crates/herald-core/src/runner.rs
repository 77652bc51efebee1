//! Bounded simulation loop.
//!
//! [`run_simulation`] drives [`Simulation::run_tick`] until one of:
//!
//! - **Tick limit**: `max_ticks` ticks have run
//! - **Quiescence**: a tick routed nothing, fired nothing, and left no
//!   pending work (when `stop_when_quiescent` is set), and the callback
//!   has no stimuli left to inject
//! - **Callback stop**: the [`TickCallback`] asked to stop
//!
//! Between ticks the loop sleeps for `tick_interval_ms` when non-zero.

use std::time::Duration;

use tracing::info;

use crate::config::SimulationSection;
use crate::tick::{Simulation, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A stimulus could not be injected.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// `max_ticks` ticks completed.
    MaxTicksReached,
    /// Nothing left to do.
    Quiescent,
    /// The tick callback requested a stop.
    CallbackStop,
}

/// Whether the loop should keep going after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Run the next tick.
    Continue,
    /// End the run now.
    Stop,
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Hooks around each tick.
pub trait TickCallback: Send {
    /// Called before tick `tick` runs; typically feeds stimuli.
    fn before_tick(&mut self, tick: u64, simulation: &mut Simulation) -> Result<(), TickError> {
        let _ = (tick, simulation);
        Ok(())
    }

    /// Called after a tick completes.
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation) -> TickControl;

    /// Whether stimuli are still scheduled for later ticks. A quiescent
    /// tick does not end the run while this holds.
    fn has_scheduled_stimuli(&self) -> bool {
        false
    }
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) -> TickControl {
        TickControl::Continue
    }
}

/// Run the simulation loop until a termination condition is met.
pub async fn run_simulation(
    simulation: &mut Simulation,
    limits: &SimulationSection,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut total_ticks: u64 = 0;

    info!(
        name = %limits.name,
        max_ticks = limits.max_ticks,
        tick_interval_ms = limits.tick_interval_ms,
        stop_when_quiescent = limits.stop_when_quiescent,
        "Simulation starting"
    );

    loop {
        let next = simulation.tick().saturating_add(1);
        callback.before_tick(next, simulation)?;

        let summary = simulation.run_tick();
        total_ticks = total_ticks.saturating_add(1);

        let control = callback.on_tick(&summary, simulation);

        let end_reason = if control == TickControl::Stop {
            info!(tick = summary.tick, "Callback requested stop");
            Some(SimulationEndReason::CallbackStop)
        } else if limits.stop_when_quiescent
            && summary.is_quiescent()
            && !callback.has_scheduled_stimuli()
        {
            info!(tick = summary.tick, "Simulation quiescent");
            Some(SimulationEndReason::Quiescent)
        } else if total_ticks >= limits.max_ticks {
            info!(tick = summary.tick, max_ticks = limits.max_ticks, "Tick limit reached");
            Some(SimulationEndReason::MaxTicksReached)
        } else {
            None
        };

        if let Some(end_reason) = end_reason {
            return Ok(SimulationResult {
                end_reason,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        if limits.tick_interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(limits.tick_interval_ms)).await;
        }
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use core::fmt;

    use herald_kernel::{Domain, ReactiveAgent, TransitionRule};
    use herald_types::{AgentId, Event};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        On,
    }

    impl fmt::Display for Light {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Off => "OFF",
                Self::On => "ON",
            })
        }
    }

    #[derive(Debug)]
    struct Lamp;

    impl Domain for Lamp {
        type State = Light;
    }

    fn lamp_sim() -> Simulation {
        let mut lamp = ReactiveAgent::new("L1", "Lamp", Light::Off, Lamp);
        lamp.register_transition(TransitionRule::on_event(Light::Off, Light::On, &["SWITCH"]));
        lamp.register_transition(TransitionRule::on_event(Light::On, Light::Off, &["SWITCH"]));
        let mut sim = Simulation::new();
        sim.add_participant(Box::new(lamp)).unwrap();
        sim
    }

    fn limits(max_ticks: u64, stop_when_quiescent: bool) -> SimulationSection {
        SimulationSection {
            max_ticks,
            stop_when_quiescent,
            ..SimulationSection::default()
        }
    }

    /// Flips the lamp every tick and stops after a fixed number of ticks.
    struct Switcher {
        stop_after: u64,
    }

    impl TickCallback for Switcher {
        fn before_tick(&mut self, _tick: u64, simulation: &mut Simulation) -> Result<(), TickError> {
            simulation.inject_event(&AgentId::from("L1"), Event::new("SWITCH", 1))
        }

        fn on_tick(&mut self, summary: &TickSummary, _simulation: &Simulation) -> TickControl {
            if summary.tick >= self.stop_after {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        }
    }

    #[tokio::test]
    async fn stops_at_the_tick_limit() {
        let mut sim = lamp_sim();
        let mut callback = Switcher { stop_after: 100 };
        let result = run_simulation(&mut sim, &limits(5, true), &mut callback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_summary.unwrap().state_of("L1"), Some("ON"));
    }

    #[tokio::test]
    async fn stops_when_quiescent() {
        let mut sim = lamp_sim();
        let result = run_simulation(&mut sim, &limits(50, true), &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::Quiescent);
        assert_eq!(result.total_ticks, 1);
    }

    #[tokio::test]
    async fn quiescence_can_be_ignored() {
        let mut sim = lamp_sim();
        let result = run_simulation(&mut sim, &limits(3, false), &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 3);
    }

    #[tokio::test]
    async fn callback_can_stop_the_run() {
        let mut sim = lamp_sim();
        let mut callback = Switcher { stop_after: 2 };
        let result = run_simulation(&mut sim, &limits(50, true), &mut callback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::CallbackStop);
        assert_eq!(result.total_ticks, 2);
        assert_eq!(sim.tick(), 2);
    }

    #[tokio::test]
    async fn scheduled_stimuli_hold_off_quiescence() {
        /// Switches the lamp once, on a later tick.
        struct Delayed {
            at: u64,
            done: bool,
        }

        impl TickCallback for Delayed {
            fn before_tick(&mut self, tick: u64, simulation: &mut Simulation) -> Result<(), TickError> {
                if tick == self.at {
                    self.done = true;
                    simulation.inject_event(&AgentId::from("L1"), Event::new("SWITCH", 1))?;
                }
                Ok(())
            }

            fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) -> TickControl {
                TickControl::Continue
            }

            fn has_scheduled_stimuli(&self) -> bool {
                !self.done
            }
        }

        let mut sim = lamp_sim();
        let mut callback = Delayed { at: 4, done: false };
        let result = run_simulation(&mut sim, &limits(50, true), &mut callback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::Quiescent);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_summary.unwrap().state_of("L1"), Some("ON"));
    }

    #[tokio::test]
    async fn injection_errors_end_the_run() {
        struct Misaddressed;

        impl TickCallback for Misaddressed {
            fn before_tick(&mut self, _tick: u64, simulation: &mut Simulation) -> Result<(), TickError> {
                simulation.inject_event(&AgentId::from("GHOST"), Event::new("SWITCH", 1))
            }

            fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) -> TickControl {
                TickControl::Continue
            }
        }

        let mut sim = lamp_sim();
        let result = run_simulation(&mut sim, &limits(5, true), &mut Misaddressed).await;
        assert!(matches!(result, Err(RunnerError::Tick { .. })));
    }
}

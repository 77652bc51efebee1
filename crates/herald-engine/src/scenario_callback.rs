//! Tick callback that feeds the scenario's stimuli.
//!
//! Before each tick it delivers the disaster report to the coordinator on
//! its scheduled tick and runs the sensor network on burst ticks. Events a
//! rescue team answers go to the rescue teams in turn, medical emergencies
//! to the medical teams in turn, and the rest are only logged.
//! After each tick it logs the summary.

use herald_core::{Simulation, TickCallback, TickControl, TickError, TickSummary};
use herald_responders::rescue::RESPONSE_EVENTS;
use herald_responders::sensors::events;
use herald_responders::{DisasterReport, SensorNetwork};
use herald_types::{AgentId, Event};
use tracing::{debug, info};

use crate::scenario::{Scenario, ScenarioConfig, SensorConfig};

/// Queue priority of the disaster report.
const DISASTER_EVENT_PRIORITY: i32 = 10;

/// Teams of one kind, handed events in turn.
struct Roster {
    teams: Vec<AgentId>,
    next: usize,
}

impl Roster {
    const fn new(teams: Vec<AgentId>) -> Self {
        Self { teams, next: 0 }
    }

    fn next_team(&mut self) -> Option<AgentId> {
        let team = self
            .next
            .checked_rem(self.teams.len())
            .and_then(|i| self.teams.get(i))
            .cloned()?;
        self.next = self.next.wrapping_add(1);
        Some(team)
    }
}

/// Callback that injects the disaster report and sensor events.
pub struct ScenarioCallback {
    coordinator: AgentId,
    rescue: Roster,
    medical: Roster,
    disaster: Option<DisasterReport>,
    report_tick: u64,
    network: SensorNetwork,
    sensors: SensorConfig,
    bursts_done: usize,
}

impl ScenarioCallback {
    /// A callback for `scenario`, drawing sensor reports from `seed`.
    pub fn new(config: &ScenarioConfig, scenario: &Scenario, seed: u64) -> Self {
        Self {
            coordinator: scenario.coordinator.clone(),
            rescue: Roster::new(scenario.rescue_teams.clone()),
            medical: Roster::new(scenario.medical_teams.clone()),
            disaster: Some(config.disaster.report()),
            report_tick: config.disaster.report_tick,
            network: SensorNetwork::new(seed),
            sensors: config.sensors.clone(),
            bursts_done: 0,
        }
    }

    fn is_burst_tick(&self, tick: u64) -> bool {
        let interval = self.sensors.interval_ticks.max(1);
        self.bursts_done < self.sensors.bursts
            && tick
                .saturating_sub(1)
                .checked_rem(interval)
                .is_some_and(|r| r == 0)
    }

    fn roster_for(&mut self, event: &Event) -> Option<&mut Roster> {
        if RESPONSE_EVENTS.iter().any(|t| event.is(t)) {
            Some(&mut self.rescue)
        } else if event.is(events::MEDICAL_EMERGENCY) {
            Some(&mut self.medical)
        } else {
            None
        }
    }

    fn sensor_burst(&mut self, tick: u64, simulation: &mut Simulation) -> Result<(), TickError> {
        self.bursts_done = self.bursts_done.saturating_add(1);
        for _ in 0..self.sensors.reports_per_burst {
            let report = self.network.random_report();
            let Some(event) = self.network.process(&report) else {
                continue;
            };
            let Some(roster) = self.roster_for(&event) else {
                debug!(tick, event = %event, "No unit answers this event");
                continue;
            };
            let Some(team) = roster.next_team() else {
                debug!(tick, event = %event, "No team available");
                continue;
            };
            info!(tick, team = %team, sensor = %report.sensor_id, event = %event, "Sensor alert dispatched");
            simulation.inject_event(&team, event)?;
        }
        Ok(())
    }
}

impl TickCallback for ScenarioCallback {
    fn before_tick(&mut self, tick: u64, simulation: &mut Simulation) -> Result<(), TickError> {
        let report_tick = self.report_tick;
        if let Some(report) = self.disaster.take_if(|_| tick >= report_tick) {
            info!(
                tick,
                kind = %report.kind,
                location = %report.location,
                required_agents = report.required_agents,
                "Disaster reported"
            );
            simulation.inject_event(&self.coordinator, report.to_event(DISASTER_EVENT_PRIORITY))?;
        }
        if self.is_burst_tick(tick) {
            self.sensor_burst(tick, simulation)?;
        }
        Ok(())
    }

    fn on_tick(&mut self, summary: &TickSummary, _simulation: &Simulation) -> TickControl {
        for agent in &summary.agents {
            debug!(
                tick = summary.tick,
                agent = %agent.id,
                state = %agent.state,
                transitions = agent.transitions,
                pending_work = agent.pending_work,
                "Agent state"
            );
        }
        TickControl::Continue
    }

    fn has_scheduled_stimuli(&self) -> bool {
        self.disaster.is_some() || self.bursts_done < self.sensors.bursts
    }
}

//! Scenario wiring: which responders exist and what happens to them.
//!
//! The `scenario` section of the config file names how many field agents,
//! rescue teams, and medical teams to create, the disaster reported to the coordinator,
//! and how often the sensor network reports. Every field has a default.

use std::path::Path;

use herald_acl::MessageTags;
use herald_core::Simulation;
use herald_responders::{
    DisasterReport, Position, coordinator_agent, field_agent, medical_agent, register_field_agent,
    rescue_agent, set_coordinator,
};
use herald_types::AgentId;
use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;

/// Id of the single coordinator.
pub const COORDINATOR_ID: &str = "COORD-001";

/// Call signs handed to field agents in creation order.
const CALL_SIGNS: &[&str] = &[
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel",
];

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// The `scenario` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Field agents under the coordinator.
    #[serde(default = "default_field_agents")]
    pub field_agents: usize,

    /// Kernel-only rescue teams fed by the sensor network.
    #[serde(default = "default_rescue_teams")]
    pub rescue_teams: usize,

    /// Kernel-only medical teams fed by the sensor network.
    #[serde(default = "default_medical_teams")]
    pub medical_teams: usize,

    /// The disaster reported to the coordinator.
    #[serde(default)]
    pub disaster: DisasterConfig,

    /// Sensor network schedule.
    #[serde(default)]
    pub sensors: SensorConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            field_agents: default_field_agents(),
            rescue_teams: default_rescue_teams(),
            medical_teams: default_medical_teams(),
            disaster: DisasterConfig::default(),
            sensors: SensorConfig::default(),
        }
    }
}

/// The disaster reported to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisasterConfig {
    /// Disaster kind.
    #[serde(default = "default_disaster_kind")]
    pub kind: String,

    /// Grid cell, as `[x, y]`.
    #[serde(default = "default_disaster_location")]
    pub location: Position,

    /// Severity label.
    #[serde(default = "default_severity")]
    pub severity: String,

    /// Field agents to dispatch.
    #[serde(default = "default_required_agents")]
    pub required_agents: usize,

    /// Mission priority passed to field agents.
    #[serde(default = "default_severity")]
    pub priority: String,

    /// Tick on which the report arrives.
    #[serde(default = "default_report_tick")]
    pub report_tick: u64,
}

impl Default for DisasterConfig {
    fn default() -> Self {
        Self {
            kind: default_disaster_kind(),
            location: default_disaster_location(),
            severity: default_severity(),
            required_agents: default_required_agents(),
            priority: default_severity(),
            report_tick: default_report_tick(),
        }
    }
}

impl DisasterConfig {
    /// The report handed to the coordinator.
    pub fn report(&self) -> DisasterReport {
        DisasterReport::new(
            self.kind.as_str(),
            self.location,
            self.severity.as_str(),
            self.required_agents,
        )
        .with_priority(self.priority.as_str())
    }
}

/// Sensor network schedule: `bursts` bursts of `reports_per_burst`
/// reports, one burst every `interval_ticks` ticks starting at tick 1.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorConfig {
    /// Number of bursts.
    #[serde(default = "default_bursts")]
    pub bursts: usize,

    /// Reports drawn per burst.
    #[serde(default = "default_reports_per_burst")]
    pub reports_per_burst: usize,

    /// Ticks between bursts; 0 is treated as 1.
    #[serde(default = "default_interval_ticks")]
    pub interval_ticks: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            bursts: default_bursts(),
            reports_per_burst: default_reports_per_burst(),
            interval_ticks: default_interval_ticks(),
        }
    }
}

const fn default_field_agents() -> usize {
    3
}

const fn default_rescue_teams() -> usize {
    2
}

const fn default_medical_teams() -> usize {
    1
}

fn default_disaster_kind() -> String {
    String::from("earthquake")
}

const fn default_disaster_location() -> Position {
    Position::new(25, 30)
}

fn default_severity() -> String {
    String::from("critical")
}

const fn default_required_agents() -> usize {
    2
}

const fn default_report_tick() -> u64 {
    1
}

const fn default_bursts() -> usize {
    3
}

const fn default_reports_per_burst() -> usize {
    5
}

const fn default_interval_ticks() -> u64 {
    10
}

/// Read the `scenario` section of the YAML file at `path`. A missing file
/// or section yields the defaults.
pub fn load_scenario_config(path: &Path) -> Result<ScenarioConfig, EngineError> {
    if !path.exists() {
        return Ok(ScenarioConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Scenario {
        message: format!("failed to read config file: {e}"),
    })?;
    parse_scenario_config(&contents)
}

/// Extract the `scenario` section from a YAML document.
pub fn parse_scenario_config(yaml: &str) -> Result<ScenarioConfig, EngineError> {
    if yaml.trim().is_empty() {
        return Ok(ScenarioConfig::default());
    }
    let raw: serde_yml::Value = serde_yml::from_str(yaml).map_err(|e| EngineError::Scenario {
        message: format!("failed to parse config YAML: {e}"),
    })?;
    raw.get("scenario").map_or_else(
        || Ok(ScenarioConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Scenario {
                message: format!("failed to parse scenario config: {e}"),
            })
        },
    )
}

// -----------------------------------------------------------------------
// Wiring
// -----------------------------------------------------------------------

/// The assembled simulation plus the ids the tick callback addresses.
pub struct Scenario {
    /// Participants in enumeration order: field agents, coordinator,
    /// rescue teams, medical teams.
    pub simulation: Simulation,
    /// The coordinator's id.
    pub coordinator: AgentId,
    /// Rescue team ids in creation order.
    pub rescue_teams: Vec<AgentId>,
    /// Medical team ids in creation order.
    pub medical_teams: Vec<AgentId>,
}

/// Create every responder and add it to a fresh simulation.
///
/// Field agents get RNG seeds derived from `seed` so their findings are
/// reproducible.
pub fn build_scenario(config: &ScenarioConfig, tags: &MessageTags, seed: u64) -> Result<Scenario, EngineError> {
    let mut simulation = Simulation::new();
    let mut coordinator = coordinator_agent(COORDINATOR_ID, "Emergency Command Center");
    coordinator.set_message_tags(tags.clone());

    for n in 1..=config.field_agents {
        let agent_seed = u64::try_from(n).map_or(seed, |k| seed.wrapping_add(k));
        let id = format!("FIELD-{n:03}");
        let call_sign = CALL_SIGNS
            .get(n.saturating_sub(1))
            .map_or_else(|| format!("Unit {n}"), |name| format!("Field Unit {name}"));
        let mut agent = field_agent(id.as_str(), call_sign, agent_seed);
        agent.set_message_tags(tags.clone());
        set_coordinator(&mut agent, COORDINATOR_ID);
        register_field_agent(&mut coordinator, id);
        simulation.add_participant(Box::new(agent))?;
    }
    simulation.add_participant(Box::new(coordinator))?;

    let mut rescue_teams = Vec::with_capacity(config.rescue_teams);
    for n in 1..=config.rescue_teams {
        let id = AgentId::new(format!("R{n:03}"));
        simulation.add_participant(Box::new(rescue_agent(id.clone(), format!("Rescue Unit {n}"))))?;
        rescue_teams.push(id);
    }

    let mut medical_teams = Vec::with_capacity(config.medical_teams);
    for n in 1..=config.medical_teams {
        let id = AgentId::new(format!("M{n:03}"));
        simulation.add_participant(Box::new(medical_agent(id.clone(), format!("Medical Unit {n}"))))?;
        medical_teams.push(id);
    }

    info!(
        field_agents = config.field_agents,
        rescue_teams = config.rescue_teams,
        medical_teams = config.medical_teams,
        participants = simulation.participants().len(),
        "Scenario assembled"
    );
    Ok(Scenario {
        simulation,
        coordinator: AgentId::from(COORDINATOR_ID),
        rescue_teams,
        medical_teams,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_section_gives_defaults() {
        let config = parse_scenario_config("simulation:\n  max_ticks: 10\n").unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(parse_scenario_config("").unwrap(), ScenarioConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let yaml = "scenario:\n  field_agents: 5\n  disaster:\n    location: [3, 4]\n    required_agents: 4\n";
        let config = parse_scenario_config(yaml).unwrap();
        assert_eq!(config.field_agents, 5);
        assert_eq!(config.rescue_teams, 2);
        assert_eq!(config.medical_teams, 1);
        assert_eq!(config.disaster.location, Position::new(3, 4));
        assert_eq!(config.disaster.kind, "earthquake");
        assert_eq!(config.disaster.report().required_agents, 4);
        assert_eq!(config.sensors, SensorConfig::default());
    }

    #[test]
    fn malformed_section_is_an_error() {
        let result = parse_scenario_config("scenario:\n  field_agents: many\n");
        assert!(matches!(result, Err(EngineError::Scenario { .. })));
    }

    #[test]
    fn builds_every_participant_in_order() {
        let config = ScenarioConfig {
            field_agents: 2,
            rescue_teams: 1,
            medical_teams: 1,
            ..ScenarioConfig::default()
        };
        let scenario = build_scenario(&config, &MessageTags::default(), 7).unwrap();
        let ids: Vec<_> = scenario
            .simulation
            .participants()
            .iter()
            .map(|p| p.participant_id().as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["FIELD-001", "FIELD-002", "COORD-001", "R001", "M001"]);
        assert_eq!(scenario.rescue_teams, vec![AgentId::from("R001")]);
        assert_eq!(scenario.medical_teams, vec![AgentId::from("M001")]);
    }
}

//! Medical team: a kernel-only agent driven by `MEDICAL_EMERGENCY` events.
//!
//! The team drives to the casualties and treats them on site, spending
//! supplies according to severity. Patients flagged for evacuation are
//! then driven to the hospital at base; everyone else is discharged on
//! site. Like the rescue team it has no mailbox.

use core::fmt;

use herald_kernel::{Domain, GuardError, ReactiveAgent, TraceSink, TransitionRule};
use herald_types::{AgentId, Event, Goal};
use serde_json::Value;
use tracing::warn;

use crate::geo::{BASE, Position};
use crate::sensors::{Severity, events};

/// Supply level of a freshly stocked team, in percent.
pub const FULL_SUPPLIES: u32 = 100;

/// Goal ids.
pub mod goals {
    /// Reach the casualties quickly.
    pub const RAPID_RESPONSE: &str = "rapid_response";
    /// Stabilize the injured.
    pub const PROVIDE_TREATMENT: &str = "provide_treatment";
    /// Drive critical patients to hospital.
    pub const EVACUATE_PATIENTS: &str = "evacuate_patients";
}

/// Medical team states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MedicalState {
    /// Waiting at base.
    Idle,
    /// Driving to the casualties.
    Dispatched,
    /// Treating on site.
    Treating,
    /// Driving patients to hospital.
    Transporting,
    /// Patients treated or delivered.
    Completed,
}

impl fmt::Display for MedicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Dispatched => "DISPATCHED",
            Self::Treating => "TREATING",
            Self::Transporting => "TRANSPORTING",
            Self::Completed => "COMPLETED",
        })
    }
}

/// Supplies one treatment uses up.
pub const fn treatment_cost(severity: Severity) -> u32 {
    match severity {
        Severity::Low => 5,
        Severity::Medium => 15,
        Severity::High => 25,
        Severity::Critical => 40,
    }
}

/// The casualties being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalMission {
    /// Site.
    pub location: Position,
    /// Patients to treat.
    pub injured: u64,
    /// Casualty severity.
    pub severity: Severity,
    /// Patients must go to hospital after treatment.
    pub needs_evacuation: bool,
    /// Set once treatment on site is done.
    pub treated: bool,
}

/// Domain data of a medical team.
#[derive(Debug, Clone)]
pub struct MedicalTeam {
    /// Current cell.
    pub position: Position,
    /// Where the team is heading.
    pub target: Option<Position>,
    /// The casualties being handled.
    pub mission: Option<MedicalMission>,
    /// Patients treated over the team's lifetime.
    pub patients_treated: u64,
    /// Remaining supplies, in percent.
    pub supplies: u32,
}

impl Default for MedicalTeam {
    fn default() -> Self {
        Self {
            position: BASE,
            target: None,
            mission: None,
            patients_treated: 0,
            supplies: FULL_SUPPLIES,
        }
    }
}

impl MedicalTeam {
    fn deliver_patients(&mut self) -> (u64, u64) {
        let injured = self.mission.as_ref().map_or(0, |m| m.injured);
        self.patients_treated = self.patients_treated.saturating_add(injured);
        (injured, self.patients_treated)
    }
}

impl Domain for MedicalTeam {
    type State = MedicalState;

    fn advance(&mut self, state: MedicalState, trace: &mut TraceSink) {
        match state {
            MedicalState::Dispatched => {
                if let Some(target) = self.target.filter(|t| *t != self.position) {
                    self.position = self.position.step_toward(target);
                    trace.record(format!("Moving to emergency: now at {}", self.position));
                }
            }
            MedicalState::Treating => {
                if let Some(mission) = self.mission.as_mut().filter(|m| !m.treated) {
                    self.supplies = self.supplies.saturating_sub(treatment_cost(mission.severity));
                    mission.treated = true;
                    trace.record(format!(
                        "Treatment successful! (Medical supplies remaining: {}%)",
                        self.supplies
                    ));
                }
            }
            MedicalState::Transporting => {
                if self.position != BASE {
                    self.position = self.position.step_toward(BASE);
                    trace.record(format!("Transporting to hospital: now at {}", self.position));
                }
            }
            MedicalState::Idle | MedicalState::Completed => {}
        }
    }

    fn is_busy(&self, state: MedicalState) -> bool {
        state != MedicalState::Idle
    }
}

/// A medical team agent.
pub type MedicalAgent = ReactiveAgent<MedicalTeam>;

type Rule = TransitionRule<MedicalAgent, MedicalState>;

/// Read the mission a `MEDICAL_EMERGENCY` event describes. The event must
/// carry a `location`. Missing fields default to one patient, `medium`
/// severity, and no evacuation; an unknown severity tag counts as `medium`.
pub fn medical_mission_from_event(event: &Event) -> Result<MedicalMission, GuardError> {
    let location = event
        .get("location")
        .and_then(Position::from_value)
        .ok_or_else(|| GuardError::failed(format!("{} without a valid location", event.event_type())))?;
    let injured = event
        .get_i64("injured_count")
        .map_or(1, |n| u64::try_from(n).unwrap_or(0));
    let severity = event
        .get_str("severity")
        .and_then(Severity::from_tag)
        .unwrap_or(Severity::Medium);
    let needs_evacuation = event
        .get("needs_evacuation")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(MedicalMission {
        location,
        injured,
        severity,
        needs_evacuation,
        treated: false,
    })
}

fn treated(agent: &MedicalAgent, evacuate: bool) -> bool {
    agent
        .domain()
        .mission
        .as_ref()
        .is_some_and(|m| m.treated && m.needs_evacuation == evacuate)
}

/// Build a medical team with its goals and rules.
pub fn medical_agent(id: impl Into<AgentId>, name: impl Into<String>) -> MedicalAgent {
    let mut agent = ReactiveAgent::new(id, name, MedicalState::Idle, MedicalTeam::default());
    agent.kernel_mut().set_quiet_step(true);

    let kernel = agent.kernel_mut();
    kernel.add_goal(Goal::new(
        goals::RAPID_RESPONSE,
        "Reach medical emergency quickly",
        5,
    ));
    kernel.add_goal(Goal::new(
        goals::PROVIDE_TREATMENT,
        "Stabilize and treat injured patients",
        5,
    ));
    kernel.add_goal(Goal::new(
        goals::EVACUATE_PATIENTS,
        "Transport critical patients to medical facilities",
        4,
    ));

    agent.register_transition(
        Rule::fallible(MedicalState::Idle, MedicalState::Dispatched, |_: &MedicalAgent, event| {
            match event {
                Some(e) if e.is(events::MEDICAL_EMERGENCY) => medical_mission_from_event(e).map(|_| true),
                _ => Ok(false),
            }
        })
        .with_action(dispatch)
        .named("dispatch to casualties"),
    );
    agent.register_transition(
        Rule::new(MedicalState::Dispatched, MedicalState::Treating, |agent: &MedicalAgent, _| {
            agent.domain().target == Some(agent.domain().position)
        })
        .with_action(|agent: &mut MedicalAgent, _| {
            complete(agent, goals::RAPID_RESPONSE);
            activate(agent, goals::PROVIDE_TREATMENT);
            let (injured, severity) = agent
                .domain()
                .mission
                .as_ref()
                .map_or((0, Severity::Medium), |m| (m.injured, m.severity));
            agent
                .kernel_mut()
                .trace(format!("Starting treatment of {injured} patients (severity: {severity})"));
        })
        .named("arrive on site"),
    );
    agent.register_transition(
        Rule::new(MedicalState::Treating, MedicalState::Transporting, |agent: &MedicalAgent, _| {
            treated(agent, true)
        })
        .with_action(|agent: &mut MedicalAgent, _| {
            complete(agent, goals::PROVIDE_TREATMENT);
            activate(agent, goals::EVACUATE_PATIENTS);
            let injured = agent.domain().mission.as_ref().map_or(0, |m| m.injured);
            agent
                .kernel_mut()
                .trace(format!("Evacuating {injured} critical patients to hospital"));
        })
        .named("start evacuation"),
    );
    agent.register_transition(
        Rule::new(MedicalState::Treating, MedicalState::Completed, |agent: &MedicalAgent, _| {
            treated(agent, false)
        })
        .with_action(|agent: &mut MedicalAgent, _| {
            complete(agent, goals::PROVIDE_TREATMENT);
            let (injured, total) = agent.domain_mut().deliver_patients();
            agent.kernel_mut().trace(format!(
                "Treatment completed on-site for {injured} patients. Total patients treated: {total}"
            ));
        })
        .named("discharge on site"),
    );
    agent.register_transition(
        Rule::new(MedicalState::Transporting, MedicalState::Completed, |agent: &MedicalAgent, _| {
            agent.domain().position == BASE
        })
        .with_action(|agent: &mut MedicalAgent, _| {
            let (injured, total) = agent.domain_mut().deliver_patients();
            let kernel = agent.kernel_mut();
            kernel.complete_active_goals();
            kernel.trace(format!(
                "Evacuation completed! Delivered {injured} patients to hospital. Total patients treated: {total}"
            ));
        })
        .named("patients delivered"),
    );
    agent.register_transition(
        Rule::always(MedicalState::Completed, MedicalState::Idle)
            .with_action(|agent: &mut MedicalAgent, _| {
                let team = agent.domain_mut();
                team.mission = None;
                team.target = None;
                let supplies = team.supplies;
                agent
                    .kernel_mut()
                    .trace(format!("Medical agent ready for next mission (supplies: {supplies}%)"));
            })
            .named("reset for next mission"),
    );
    agent
}

fn activate(agent: &mut MedicalAgent, goal: &str) {
    if let Err(err) = agent.kernel_mut().activate_goal(goal) {
        warn!(agent = %agent.kernel().id(), error = %err, "Goal update failed");
    }
}

fn complete(agent: &mut MedicalAgent, goal: &str) {
    if let Err(err) = agent.kernel_mut().complete_goal(goal) {
        warn!(agent = %agent.kernel().id(), error = %err, "Goal update failed");
    }
}

fn dispatch(agent: &mut MedicalAgent, event: Option<&Event>) {
    let Some(Ok(mission)) = event.map(medical_mission_from_event) else {
        return;
    };
    agent.kernel_mut().trace(format!(
        "Dispatched to medical emergency at {} ({} injured, severity: {})",
        mission.location, mission.injured, mission.severity
    ));
    let team = agent.domain_mut();
    team.target = Some(mission.location);
    team.mission = Some(mission);
    activate(agent, goals::RAPID_RESPONSE);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_types::GoalStatus;
    use serde_json::json;

    use super::*;

    fn emergency(x: i64, y: i64, injured: i64, severity: &str, evacuate: bool) -> Event {
        Event::new(events::MEDICAL_EMERGENCY, 5)
            .with("location", json!([x, y]))
            .with("injured_count", injured)
            .with("severity", severity)
            .with("needs_evacuation", evacuate)
    }

    fn run(agent: &mut MedicalAgent, ticks: usize) -> Vec<MedicalState> {
        let mut seen = Vec::new();
        for _ in 0..ticks {
            agent.update();
            if seen.last() != Some(&agent.state()) {
                seen.push(agent.state());
            }
        }
        seen
    }

    fn status(agent: &MedicalAgent, goal: &str) -> GoalStatus {
        agent.kernel().goal(goal).unwrap().status
    }

    #[test]
    fn mission_defaults() {
        let bare = Event::new(events::MEDICAL_EMERGENCY, 3).with("location", json!([2, 2]));
        let mission = medical_mission_from_event(&bare).unwrap();
        assert_eq!(mission.injured, 1);
        assert_eq!(mission.severity, Severity::Medium);
        assert!(!mission.needs_evacuation);

        let odd = bare.with("severity", "dire");
        assert_eq!(medical_mission_from_event(&odd).unwrap().severity, Severity::Medium);
    }

    #[test]
    fn critical_patients_are_evacuated_to_hospital() {
        let mut agent = medical_agent("M001", "Medical Unit 1");
        agent.receive_event(emergency(2, 1, 4, "critical", true));

        let seen = run(&mut agent, 12);
        assert_eq!(
            seen,
            vec![
                MedicalState::Dispatched,
                MedicalState::Treating,
                MedicalState::Transporting,
                MedicalState::Completed,
                MedicalState::Idle,
            ]
        );
        let team = agent.domain();
        assert_eq!(team.patients_treated, 4);
        assert_eq!(team.supplies, 60);
        assert_eq!(team.position, BASE);
        assert!(team.mission.is_none());
        assert!(!agent.has_pending_work());
        for goal in [goals::RAPID_RESPONSE, goals::PROVIDE_TREATMENT, goals::EVACUATE_PATIENTS] {
            assert_eq!(status(&agent, goal), GoalStatus::Completed, "goal {goal}");
        }
    }

    #[test]
    fn walking_wounded_are_treated_on_site() {
        let mut agent = medical_agent("M001", "Medical Unit 1");
        agent.receive_event(emergency(1, 1, 2, "low", false));

        let seen = run(&mut agent, 8);
        assert_eq!(
            seen,
            vec![
                MedicalState::Dispatched,
                MedicalState::Treating,
                MedicalState::Completed,
                MedicalState::Idle,
            ]
        );
        let team = agent.domain();
        assert_eq!(team.patients_treated, 2);
        assert_eq!(team.supplies, 95);
        assert_eq!(team.position, Position::new(1, 1));
        assert_eq!(status(&agent, goals::PROVIDE_TREATMENT), GoalStatus::Completed);
        assert_ne!(status(&agent, goals::EVACUATE_PATIENTS), GoalStatus::Completed);
    }

    #[test]
    fn supplies_never_go_below_zero() {
        let mut agent = medical_agent("M001", "Medical Unit 1");
        for _ in 0..3 {
            agent.receive_event(emergency(0, 0, 1, "critical", false));
            run(&mut agent, 4);
        }
        assert_eq!(agent.domain().supplies, 0);
        assert_eq!(agent.domain().patients_treated, 3);
    }

    #[test]
    fn other_emergencies_are_ignored() {
        let mut agent = medical_agent("M001", "Medical Unit 1");
        agent.receive_event(Event::new(events::FIRE_DETECTED, 4).with("location", json!([1, 1])));
        agent.update();
        assert_eq!(agent.state(), MedicalState::Idle);
    }
}

//! Rescue team: a kernel-only agent driven by sensor events.
//!
//! It answers collapse, earthquake, and fire events by driving to the
//! site, rescuing the reported victims, and bringing them back to base.
//! It has no mailbox, so messages addressed to it are dropped by the
//! router.

use core::fmt;

use herald_kernel::{Domain, GuardError, ReactiveAgent, TraceSink, TransitionRule};
use herald_types::{AgentId, Event, Goal};
use tracing::warn;

use crate::geo::{BASE, Position};
use crate::sensors::events;

/// Event types a rescue team responds to.
pub const RESPONSE_EVENTS: [&str; 3] = [
    events::BUILDING_COLLAPSE,
    events::MAJOR_EARTHQUAKE,
    events::FIRE_DETECTED,
];

/// Goal ids.
pub mod goals {
    /// Reach the site quickly.
    pub const QUICK_RESPONSE: &str = "quick_response";
    /// Rescue everyone trapped.
    pub const RESCUE_TRAPPED: &str = "rescue_trapped";
    /// Bring the victims to safety.
    pub const TRANSPORT_VICTIMS: &str = "transport_victims";
}

/// Rescue team states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RescueState {
    /// Waiting at base.
    Idle,
    /// Driving to the site.
    Responding,
    /// Rescuing on site.
    Rescuing,
    /// Driving victims back to base.
    Transporting,
    /// Victims delivered.
    Completed,
}

impl fmt::Display for RescueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Responding => "RESPONDING",
            Self::Rescuing => "RESCUING",
            Self::Transporting => "TRANSPORTING",
            Self::Completed => "COMPLETED",
        })
    }
}

/// The emergency being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescueMission {
    /// Type of the triggering event.
    pub event_type: String,
    /// Site.
    pub location: Position,
    /// People to rescue.
    pub victims: u64,
    /// Set once everyone on site is out.
    pub rescued: bool,
}

/// Domain data of a rescue team.
#[derive(Debug, Clone, Default)]
pub struct RescueTeam {
    /// Current cell.
    pub position: Position,
    /// Where the team is heading.
    pub target: Option<Position>,
    /// The emergency being handled.
    pub mission: Option<RescueMission>,
    /// People delivered to base over the team's lifetime.
    pub rescued_count: u64,
}

impl Domain for RescueTeam {
    type State = RescueState;

    fn advance(&mut self, state: RescueState, trace: &mut TraceSink) {
        match state {
            RescueState::Responding => {
                if let Some(target) = self.target.filter(|t| *t != self.position) {
                    self.position = self.position.step_toward(target);
                    trace.record(format!("Moving to target: now at {}", self.position));
                }
            }
            RescueState::Rescuing => {
                if let Some(mission) = self.mission.as_mut().filter(|m| !m.rescued) {
                    mission.rescued = true;
                    trace.record("Rescue operation successful!");
                }
            }
            RescueState::Transporting => {
                if self.position != BASE {
                    self.position = self.position.step_toward(BASE);
                    trace.record(format!("Transporting victims: now at {}", self.position));
                }
            }
            RescueState::Idle | RescueState::Completed => {}
        }
    }

    fn is_busy(&self, state: RescueState) -> bool {
        state != RescueState::Idle
    }
}

/// A rescue team agent.
pub type RescueAgent = ReactiveAgent<RescueTeam>;

type Rule = TransitionRule<RescueAgent, RescueState>;

/// Read the mission an emergency event describes. The event must carry a
/// `location`; the victim count comes from `trapped_people`, then
/// `injured_count`, and defaults to one.
pub fn mission_from_event(event: &Event) -> Result<RescueMission, GuardError> {
    let location = event
        .get("location")
        .and_then(Position::from_value)
        .ok_or_else(|| GuardError::failed(format!("{} without a valid location", event.event_type())))?;
    let victims = event
        .get_i64("trapped_people")
        .or_else(|| event.get_i64("injured_count"))
        .map_or(1, |n| u64::try_from(n).unwrap_or(0));
    Ok(RescueMission {
        event_type: String::from(event.event_type()),
        location,
        victims,
        rescued: false,
    })
}

/// Build a rescue team with its goals and rules.
pub fn rescue_agent(id: impl Into<AgentId>, name: impl Into<String>) -> RescueAgent {
    let mut agent = ReactiveAgent::new(id, name, RescueState::Idle, RescueTeam::default());
    agent.kernel_mut().set_quiet_step(true);

    let kernel = agent.kernel_mut();
    kernel.add_goal(Goal::new(
        goals::QUICK_RESPONSE,
        "Respond to emergency events within minimal time",
        5,
    ));
    kernel.add_goal(Goal::new(
        goals::RESCUE_TRAPPED,
        "Locate and rescue trapped individuals",
        5,
    ));
    kernel.add_goal(Goal::new(
        goals::TRANSPORT_VICTIMS,
        "Transport rescued victims to medical facilities",
        4,
    ));

    agent.register_transition(
        Rule::fallible(RescueState::Idle, RescueState::Responding, |_: &RescueAgent, event| {
            match event {
                Some(e) if RESPONSE_EVENTS.iter().any(|t| e.is(t)) => mission_from_event(e).map(|_| true),
                _ => Ok(false),
            }
        })
        .with_action(start_response)
        .named("respond to emergency"),
    );
    agent.register_transition(
        Rule::new(RescueState::Responding, RescueState::Rescuing, |agent: &RescueAgent, _| {
            agent.domain().target == Some(agent.domain().position)
        })
        .with_action(|agent: &mut RescueAgent, _| {
            activate(agent, goals::RESCUE_TRAPPED);
            let victims = agent.domain().mission.as_ref().map_or(0, |m| m.victims);
            let at = agent.domain().position;
            let kernel = agent.kernel_mut();
            kernel.trace(format!("Starting rescue operation at {at}"));
            kernel.trace(format!("Attempting to rescue {victims} victims"));
        })
        .named("arrive on site"),
    );
    agent.register_transition(
        Rule::new(RescueState::Rescuing, RescueState::Transporting, |agent: &RescueAgent, _| {
            agent.domain().mission.as_ref().is_some_and(|m| m.rescued)
        })
        .with_action(|agent: &mut RescueAgent, _| {
            if let Err(err) = agent.kernel_mut().complete_goal(goals::RESCUE_TRAPPED) {
                warn!(agent = %agent.kernel().id(), error = %err, "Goal update failed");
            }
            activate(agent, goals::TRANSPORT_VICTIMS);
            let victims = agent.domain().mission.as_ref().map_or(0, |m| m.victims);
            agent
                .kernel_mut()
                .trace(format!("Transporting {victims} victims to safety"));
        })
        .named("rescue complete"),
    );
    agent.register_transition(
        Rule::new(RescueState::Transporting, RescueState::Completed, |agent: &RescueAgent, _| {
            agent.domain().position == BASE
        })
        .with_action(|agent: &mut RescueAgent, _| {
            let team = agent.domain_mut();
            let victims = team.mission.as_ref().map_or(0, |m| m.victims);
            team.rescued_count = team.rescued_count.saturating_add(victims);
            let total = team.rescued_count;
            let kernel = agent.kernel_mut();
            kernel.complete_active_goals();
            kernel.trace(format!(
                "Mission completed! Delivered {victims} victims. Total rescued: {total}"
            ));
        })
        .named("victims delivered"),
    );
    agent.register_transition(
        Rule::always(RescueState::Completed, RescueState::Idle)
            .with_action(|agent: &mut RescueAgent, _| {
                let team = agent.domain_mut();
                team.mission = None;
                team.target = None;
                agent.kernel_mut().trace("Agent ready for next mission");
            })
            .named("reset for next mission"),
    );
    agent
}

fn activate(agent: &mut RescueAgent, goal: &str) {
    if let Err(err) = agent.kernel_mut().activate_goal(goal) {
        warn!(agent = %agent.kernel().id(), error = %err, "Goal update failed");
    }
}

fn start_response(agent: &mut RescueAgent, event: Option<&Event>) {
    let Some(Ok(mission)) = event.map(mission_from_event) else {
        return;
    };
    agent.kernel_mut().trace(format!(
        "Responding to {} at location {}",
        mission.event_type, mission.location
    ));
    let team = agent.domain_mut();
    team.target = Some(mission.location);
    team.mission = Some(mission);
    activate(agent, goals::QUICK_RESPONSE);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_types::GoalStatus;
    use serde_json::json;

    use super::*;

    fn collapse(x: i64, y: i64, trapped: i64) -> Event {
        Event::new(events::BUILDING_COLLAPSE, 5)
            .with("location", json!([x, y]))
            .with("trapped_people", trapped)
    }

    fn run(agent: &mut RescueAgent, ticks: usize) -> Vec<RescueState> {
        let mut seen = Vec::new();
        for _ in 0..ticks {
            agent.update();
            if seen.last() != Some(&agent.state()) {
                seen.push(agent.state());
            }
        }
        seen
    }

    #[test]
    fn victim_count_falls_back_to_injured_then_one() {
        let base = Event::new(events::FIRE_DETECTED, 4).with("location", json!([1, 1]));
        assert_eq!(mission_from_event(&base).unwrap().victims, 1);
        let injured = base.clone().with("injured_count", 4);
        assert_eq!(mission_from_event(&injured).unwrap().victims, 4);
        let trapped = injured.with("trapped_people", 7);
        assert_eq!(mission_from_event(&trapped).unwrap().victims, 7);
    }

    #[test]
    fn full_rescue_cycle() {
        let mut agent = rescue_agent("R001", "Rescue Unit Alpha");
        agent.receive_event(collapse(2, 1, 3));

        let seen = run(&mut agent, 12);
        assert_eq!(
            seen,
            vec![
                RescueState::Responding,
                RescueState::Rescuing,
                RescueState::Transporting,
                RescueState::Completed,
                RescueState::Idle,
            ]
        );
        assert_eq!(agent.domain().rescued_count, 3);
        assert_eq!(agent.domain().position, BASE);
        assert!(agent.domain().mission.is_none());
        assert!(!agent.has_pending_work());
        for goal in agent.kernel().goals() {
            assert_eq!(goal.status, GoalStatus::Completed, "goal {}", goal.id);
        }
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut agent = rescue_agent("R001", "Rescue Unit Alpha");
        agent.receive_event(Event::new(events::GAS_LEAK_DETECTED, 4).with("location", json!([1, 1])));
        agent.update();
        assert_eq!(agent.state(), RescueState::Idle);
    }

    #[test]
    fn emergency_without_location_is_contained() {
        let mut agent = rescue_agent("R001", "Rescue Unit Alpha");
        agent.receive_event(Event::new(events::MAJOR_EARTHQUAKE, 5));
        agent.receive_event(collapse(1, 0, 2));
        agent.update();
        assert_eq!(agent.state(), RescueState::Responding);
        assert_eq!(
            agent.domain().mission.as_ref().map(|m| m.location),
            Some(Position::new(1, 0))
        );
        assert_eq!(
            agent.kernel().current_goal().map(|g| g.id.as_str()),
            Some(goals::QUICK_RESPONSE)
        );
    }
}

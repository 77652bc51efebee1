//! Field agent: accepts investigation missions over messages, travels,
//! investigates, and reports back.
//!
//! ```text
//! IDLE -> TRAVELING -> INVESTIGATING -> REPORTING -> COMPLETED -> IDLE
//!            \-> IDLE   (arrived somewhere with no mission, e.g. base)
//! ```
//!
//! The rules are driven by domain state (target set, arrival, finished
//! investigation), so the agent runs with the quiet step enabled.

use core::fmt;

use herald_acl::{CommunicatingAgent, HandlerError, Message, MessageParser};
use herald_kernel::{Domain, TraceSink, TransitionRule};
use herald_types::{AgentId, ConversationId, Event, Performative};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};
use tracing::warn;

use crate::geo::{BASE, Position};

/// Possible findings of an investigation.
const FINDINGS: [&str; 5] = [
    "No survivors found, area secure",
    "5 survivors located, need immediate evacuation",
    "Structural damage detected, area unsafe",
    "Medical emergency - 3 critical patients",
    "Gas leak detected, evacuating area",
];

/// Field agent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldState {
    /// Waiting for a mission.
    Idle,
    /// Moving toward the target.
    Traveling,
    /// On site, investigating.
    Investigating,
    /// Sending the discovery report.
    Reporting,
    /// Mission done; resets next tick.
    Completed,
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Traveling => "TRAVELING",
            Self::Investigating => "INVESTIGATING",
            Self::Reporting => "REPORTING",
            Self::Completed => "COMPLETED",
        })
    }
}

/// An accepted investigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    /// Where to investigate.
    pub location: Position,
    /// Mission kind given by the coordinator.
    pub mission_type: Option<String>,
    /// Priority given by the coordinator.
    pub priority: Option<String>,
    /// Set once the on-site investigation finished.
    pub investigation_complete: bool,
    /// Conversation the mission was assigned in; reports continue it.
    pub conversation_id: ConversationId,
}

/// Domain data of a field agent.
#[derive(Debug, Clone)]
pub struct FieldUnit {
    /// Current cell.
    pub position: Position,
    /// Where the unit is heading, if anywhere.
    pub target: Option<Position>,
    /// The accepted mission.
    pub mission: Option<Mission>,
    /// Who to report to.
    pub coordinator: Option<AgentId>,
    /// Findings reported so far.
    pub discoveries: Vec<String>,
    rng: SmallRng,
}

impl FieldUnit {
    /// A unit at base with a reproducible findings generator.
    pub fn new(seed: u64) -> Self {
        Self {
            position: BASE,
            target: None,
            mission: None,
            coordinator: None,
            discoveries: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn arrived(&self) -> bool {
        self.target.is_some_and(|target| target == self.position)
    }
}

impl Domain for FieldUnit {
    type State = FieldState;

    fn advance(&mut self, state: FieldState, trace: &mut TraceSink) {
        match state {
            FieldState::Traveling => {
                if let Some(target) = self.target.filter(|t| *t != self.position) {
                    self.position = self.position.step_toward(target);
                    trace.record(format!("Moving to target: now at {}", self.position));
                }
            }
            FieldState::Investigating => {
                if let Some(mission) = self.mission.as_mut().filter(|m| !m.investigation_complete) {
                    mission.investigation_complete = true;
                    trace.record("Investigation complete");
                }
            }
            FieldState::Idle | FieldState::Reporting | FieldState::Completed => {}
        }
    }

    fn is_busy(&self, state: FieldState) -> bool {
        state != FieldState::Idle || self.target.is_some()
    }
}

/// A field agent.
pub type FieldAgent = CommunicatingAgent<FieldUnit>;

type Rule = TransitionRule<FieldAgent, FieldState>;

/// Build a field agent with its rules and message handlers.
pub fn field_agent(id: impl Into<AgentId>, name: impl Into<String>, seed: u64) -> FieldAgent {
    let mut agent = CommunicatingAgent::new(id, name, FieldState::Idle, FieldUnit::new(seed));
    agent.kernel_mut().set_quiet_step(true);

    agent.register_transition(
        Rule::new(FieldState::Idle, FieldState::Traveling, |agent: &FieldAgent, _| {
            agent.domain().target.is_some()
        })
        .named("depart"),
    );
    agent.register_transition(
        Rule::new(FieldState::Traveling, FieldState::Investigating, |agent: &FieldAgent, _| {
            agent.domain().arrived() && agent.domain().mission.is_some()
        })
        .with_action(|agent: &mut FieldAgent, _| {
            let at = agent.domain().position;
            agent
                .kernel_mut()
                .trace(format!("Starting investigation at {at}"));
        })
        .named("arrive on site"),
    );
    agent.register_transition(
        Rule::new(FieldState::Traveling, FieldState::Idle, |agent: &FieldAgent, _| {
            agent.domain().arrived() && agent.domain().mission.is_none()
        })
        .with_action(|agent: &mut FieldAgent, _| {
            agent.domain_mut().target = None;
            agent.kernel_mut().trace("Arrived, standing by");
        })
        .named("arrive without mission"),
    );
    agent.register_transition(
        Rule::new(FieldState::Investigating, FieldState::Reporting, |agent: &FieldAgent, _| {
            agent
                .domain()
                .mission
                .as_ref()
                .is_some_and(|m| m.investigation_complete)
        })
        .with_action(send_investigation_report)
        .named("finish investigation"),
    );
    agent.register_transition(
        Rule::always(FieldState::Reporting, FieldState::Completed)
            .with_action(complete_mission)
            .named("report sent"),
    );
    agent.register_transition(
        Rule::always(FieldState::Completed, FieldState::Idle)
            .with_action(|agent: &mut FieldAgent, _| {
                let unit = agent.domain_mut();
                unit.mission = None;
                unit.target = None;
                agent.kernel_mut().trace("Ready for next mission");
            })
            .named("reset for next mission"),
    );

    agent.register_message_handler(Performative::Request, handle_request);
    agent.register_message_handler(Performative::QueryIf, handle_query);
    agent.register_message_handler(Performative::Confirm, |agent, msg| {
        agent
            .kernel_mut()
            .trace(format!("Coordinator confirmed: {}", msg.content()));
        Ok(())
    });

    agent
        .kernel_mut()
        .trace("Field agent initialized and ready for deployment");
    agent
}

/// Record the coordinator this agent reports to.
pub fn set_coordinator(agent: &mut FieldAgent, coordinator: impl Into<AgentId>) {
    let coordinator = coordinator.into();
    agent
        .kernel_mut()
        .trace(format!("Assigned to coordinator: {coordinator}"));
    agent.domain_mut().coordinator = Some(coordinator);
}

// ---------------------------------------------------------------------------
// Message handlers
// ---------------------------------------------------------------------------

fn handle_request(agent: &mut FieldAgent, msg: &Message) -> Result<(), HandlerError> {
    if !msg.content().is_object() {
        agent.reply(msg, Performative::Refuse, json!({"reason": "Invalid request format"}))?;
        return Ok(());
    }
    let action = MessageParser::extract_action(msg).unwrap_or_default();
    let parameters = msg.content().get("parameters").cloned().unwrap_or(Value::Null);
    agent.kernel_mut().trace(format!(
        "Received REQUEST from {}: action={action}",
        msg.sender()
    ));

    match action.as_str() {
        "investigate_location" => accept_investigation(agent, msg, &parameters),
        "return_to_base" => {
            agent.domain_mut().target = Some(BASE);
            agent.reply(msg, Performative::Agree, json!({"action": "return_to_base"}))?;
            agent.kernel_mut().trace("Returning to base");
            Ok(())
        }
        "assist_agent" => {
            let target_agent = parameters.get("agent_id").cloned().unwrap_or(Value::Null);
            let location = parameters.get("location").and_then(Position::from_value);
            if let Some(location) = location.filter(|_| agent.domain().mission.is_none()) {
                agent.domain_mut().target = Some(location);
            }
            agent.reply(
                msg,
                Performative::Agree,
                json!({"action": "assist_agent", "target_agent": target_agent}),
            )?;
            agent
                .kernel_mut()
                .trace(format!("Moving to assist agent {target_agent}"));
            Ok(())
        }
        other => {
            agent.reply(
                msg,
                Performative::Refuse,
                json!({"reason": format!("Unknown action: {other}")}),
            )?;
            Ok(())
        }
    }
}

fn accept_investigation(agent: &mut FieldAgent, msg: &Message, parameters: &Value) -> Result<(), HandlerError> {
    if agent.domain().mission.is_some() {
        agent.reply(msg, Performative::Refuse, json!({"reason": "Already on active mission"}))?;
        return Ok(());
    }
    let Some(location) = parameters.get("location").and_then(Position::from_value) else {
        agent.reply(msg, Performative::Refuse, json!({"reason": "Missing location"}))?;
        return Ok(());
    };
    let text = |key: &str| parameters.get(key).and_then(Value::as_str).map(String::from);

    let unit = agent.domain_mut();
    unit.mission = Some(Mission {
        location,
        mission_type: text("mission_type"),
        priority: text("priority"),
        investigation_complete: false,
        conversation_id: msg.conversation_id(),
    });
    unit.target = Some(location);
    unit.coordinator = Some(msg.sender().clone());
    let eta = unit.position.distance(location);

    agent.reply(
        msg,
        Performative::Agree,
        json!({
            "action": "investigate_location",
            "location": location.to_value(),
            "estimated_arrival": eta,
        }),
    )?;
    agent
        .kernel_mut()
        .trace(format!("Accepted investigation mission to {location}"));
    Ok(())
}

fn handle_query(agent: &mut FieldAgent, msg: &Message) -> Result<(), HandlerError> {
    let query = match msg.content() {
        Value::Object(map) => map.get("query").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    if query.as_str() != Some("mission_status") {
        return Err(HandlerError::failed(format!("Unknown query: {query}")));
    }
    let unit = agent.domain();
    let status = json!({
        "type": "status_update",
        "status": agent.state().to_string().to_lowercase(),
        "location": unit.position.to_value(),
        "mission": unit.mission.as_ref().and_then(|m| m.mission_type.clone()),
    });
    agent.reply(msg, Performative::Inform, status)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Transition actions
// ---------------------------------------------------------------------------

fn send_investigation_report(agent: &mut FieldAgent, _event: Option<&Event>) {
    let Some(coordinator) = agent.domain().coordinator.clone() else {
        agent.kernel_mut().trace("ERROR: No coordinator assigned");
        return;
    };
    let unit = agent.domain_mut();
    let pick = unit.rng.random_range(0..FINDINGS.len());
    let finding = FINDINGS.get(pick).copied().unwrap_or("Nothing to report");
    unit.discoveries.push(String::from(finding));

    let lower = finding.to_lowercase();
    let severity = if ["critical", "emergency", "leak"].iter().any(|w| lower.contains(w)) {
        "critical"
    } else {
        "normal"
    };
    let mut report = Message::new(
        Performative::Inform,
        agent.id().clone(),
        coordinator,
        json!({
            "type": "discovery",
            "discovery": finding,
            "location": agent.domain().position.to_value(),
            "severity": severity,
        }),
    )
    .with_tags(agent.message_tags());
    if let Some(mission) = &agent.domain().mission {
        report = report.in_conversation(mission.conversation_id);
    }
    if let Err(err) = agent.send_message(report) {
        warn!(agent = %agent.id(), error = %err, "Discovery report not sent");
        return;
    }
    agent
        .kernel_mut()
        .trace(format!("Sent discovery report: {finding}"));
}

fn complete_mission(agent: &mut FieldAgent, _event: Option<&Event>) {
    if let Some(coordinator) = agent.domain().coordinator.clone() {
        let mut notice = Message::new(
            Performative::Inform,
            agent.id().clone(),
            coordinator,
            json!({
                "type": "mission_complete",
                "result": "success",
                "discoveries": agent.domain().discoveries.len(),
            }),
        )
        .with_tags(agent.message_tags());
        if let Some(mission) = &agent.domain().mission {
            notice = notice.in_conversation(mission.conversation_id);
        }
        if let Err(err) = agent.send_message(notice) {
            warn!(agent = %agent.id(), error = %err, "Completion notice not sent");
        }
    }
    agent.kernel_mut().trace("Mission completed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(action: &str, parameters: &Value) -> Message {
        Message::new(
            Performative::Request,
            "COORD-001",
            "FIELD-001",
            json!({"action": action, "parameters": parameters}),
        )
    }

    fn investigate(x: i64, y: i64) -> Message {
        request(
            "investigate_location",
            &json!({"location": [x, y], "mission_type": "earthquake_response", "priority": "critical"}),
        )
    }

    fn states_until_idle(agent: &mut FieldAgent, max_ticks: usize) -> Vec<FieldState> {
        let mut seen = Vec::new();
        for _ in 0..max_ticks {
            agent.update();
            if seen.last() != Some(&agent.state()) {
                seen.push(agent.state());
            }
            if agent.state() == FieldState::Idle && agent.domain().target.is_none() {
                break;
            }
        }
        seen
    }

    #[test]
    fn accepts_a_mission_and_runs_it_to_completion() {
        let mut agent = field_agent("FIELD-001", "Alpha", 1);
        let assignment = investigate(2, 3);
        agent.receive_message(assignment.clone());

        let seen = states_until_idle(&mut agent, 20);
        assert_eq!(
            seen,
            vec![
                FieldState::Traveling,
                FieldState::Investigating,
                FieldState::Reporting,
                FieldState::Completed,
                FieldState::Idle,
            ]
        );
        assert_eq!(agent.domain().position, Position::new(2, 3));

        let out = agent.take_outbox();
        let kinds: Vec<_> = out.iter().map(Message::performative).collect();
        assert_eq!(
            kinds,
            vec![Performative::Agree, Performative::Inform, Performative::Inform]
        );
        assert!(out.iter().all(|m| m.conversation_id() == assignment.conversation_id()));
        let agree = out.first().unwrap();
        assert_eq!(agree.content().get("estimated_arrival"), Some(&json!(3)));
        let discovery = out.get(1).unwrap();
        assert_eq!(discovery.content().get("type"), Some(&json!("discovery")));
        let done = out.get(2).unwrap();
        assert_eq!(done.content().get("discoveries"), Some(&json!(1)));
    }

    #[test]
    fn refuses_a_second_mission() {
        let mut agent = field_agent("FIELD-001", "Alpha", 1);
        agent.receive_message(investigate(5, 5));
        agent.receive_message(investigate(9, 9));
        agent.process_messages();

        let out = agent.take_outbox();
        let second = out.get(1).unwrap();
        assert_eq!(second.performative(), Performative::Refuse);
        assert_eq!(
            second.content(),
            &json!({"reason": "Already on active mission"})
        );
    }

    #[test]
    fn refuses_unknown_actions_and_bad_content() {
        let mut agent = field_agent("FIELD-001", "Alpha", 1);
        agent.receive_message(request("dance", &json!({})));
        agent.receive_message(request("investigate_location", &json!({})));
        agent.process_messages();

        let reasons: Vec<_> = agent
            .take_outbox()
            .iter()
            .map(|m| m.content().get("reason").cloned().unwrap())
            .collect();
        assert_eq!(
            reasons,
            vec![json!("Unknown action: dance"), json!("Missing location")]
        );
    }

    #[test]
    fn return_to_base_travels_home_and_stands_by() {
        let mut agent = field_agent("FIELD-001", "Alpha", 1);
        agent.domain_mut().position = Position::new(2, 0);
        agent.receive_message(request("return_to_base", &json!({})));

        let seen = states_until_idle(&mut agent, 10);
        assert_eq!(seen, vec![FieldState::Traveling, FieldState::Idle]);
        assert_eq!(agent.domain().position, BASE);
    }

    #[test]
    fn answers_status_queries() {
        let mut agent = field_agent("FIELD-001", "Alpha", 1);
        agent.receive_message(Message::new(
            Performative::QueryIf,
            "COORD-001",
            "FIELD-001",
            json!({"query": "mission_status", "agent": "FIELD-001"}),
        ));
        agent.receive_message(Message::new(
            Performative::QueryIf,
            "COORD-001",
            "FIELD-001",
            json!({"query": "fuel"}),
        ));
        agent.process_messages();

        let out = agent.take_outbox();
        let status = out.first().unwrap();
        assert_eq!(status.performative(), Performative::Inform);
        assert_eq!(status.content().get("status"), Some(&json!("idle")));
        assert_eq!(status.content().get("location"), Some(&json!([0, 0])));
        assert_eq!(out.get(1).unwrap().performative(), Performative::NotUnderstood);
    }

    #[test]
    fn missing_coordinator_is_traced_not_fatal() {
        let mut agent = field_agent("FIELD-001", "Alpha", 1);
        agent.domain_mut().target = Some(BASE);
        agent.domain_mut().mission = Some(Mission {
            location: BASE,
            mission_type: None,
            priority: None,
            investigation_complete: false,
            conversation_id: ConversationId::new(),
        });
        let seen = states_until_idle(&mut agent, 10);
        assert_eq!(seen.last(), Some(&FieldState::Idle));
        assert!(agent
            .kernel()
            .execution_trace()
            .iter()
            .any(|line| line.contains("ERROR: No coordinator assigned")));
        assert_eq!(agent.mailbox().outbox_len(), 0);
    }
}

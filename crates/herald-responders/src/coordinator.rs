//! Coordinator agent: assesses reported disasters, dispatches field agents
//! with `request` messages, and tracks their missions until all report
//! completion.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use herald_acl::{CommunicatingAgent, HandlerError, Message, MessageError};
use herald_kernel::{Domain, GuardError, TransitionRule};
use herald_types::{AgentId, ConversationId, Event, MessageId, Performative};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::geo::Position;

/// Event types the coordinator reacts to.
pub mod events {
    /// A disaster needs a response. Payload: `type`, `location`, `severity`,
    /// `required_agents`, `priority`.
    pub const DISASTER_REPORTED: &str = "DISASTER_REPORTED";
    /// At least one field agent was sent out.
    pub const AGENTS_DISPATCHED: &str = "AGENTS_DISPATCHED";
    /// The last active mission reported completion.
    pub const ALL_MISSIONS_COMPLETE: &str = "ALL_MISSIONS_COMPLETE";
}

/// Coordinator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// No disaster reported yet.
    Idle,
    /// Assessing a report and dispatching agents.
    Coordinating,
    /// Agents are out; waiting for their reports.
    Monitoring,
    /// Every mission reported completion.
    Completed,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Coordinating => "COORDINATING",
            Self::Monitoring => "MONITORING",
            Self::Completed => "COMPLETED",
        })
    }
}

/// A disaster to respond to, carried as the payload of a
/// [`events::DISASTER_REPORTED`] event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasterReport {
    /// Disaster kind, e.g. `earthquake`.
    pub kind: String,
    /// Where it happened.
    pub location: Position,
    /// Free-form severity label.
    pub severity: String,
    /// How many field agents to send.
    pub required_agents: usize,
    /// Mission priority passed on to field agents.
    pub priority: String,
}

impl DisasterReport {
    /// A report needing `required_agents` agents at `priority` "high".
    pub fn new(kind: impl Into<String>, location: Position, severity: impl Into<String>, required_agents: usize) -> Self {
        Self {
            kind: kind.into(),
            location,
            severity: severity.into(),
            required_agents,
            priority: String::from("high"),
        }
    }

    /// Builder: override the mission priority.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Read a report from an event payload. `type` and `location` are
    /// required; `required_agents` defaults to 2.
    pub fn from_event(event: &Event) -> Result<Self, GuardError> {
        let kind = event
            .get_str("type")
            .ok_or_else(|| GuardError::failed("disaster report without type"))?;
        let location = event
            .get("location")
            .and_then(Position::from_value)
            .ok_or_else(|| GuardError::failed("disaster report without a valid location"))?;
        let required_agents = event
            .get_i64("required_agents")
            .map_or(Ok(2), usize::try_from)
            .map_err(|err| GuardError::failed(format!("invalid required_agents: {err}")))?;
        Ok(Self {
            kind: String::from(kind),
            location,
            severity: String::from(event.get_str("severity").unwrap_or("unknown")),
            required_agents,
            priority: String::from(event.get_str("priority").unwrap_or("high")),
        })
    }

    /// The [`events::DISASTER_REPORTED`] event carrying this report.
    pub fn to_event(&self, priority: i32) -> Event {
        Event::new(events::DISASTER_REPORTED, priority)
            .with("type", self.kind.as_str())
            .with("location", self.location.to_value())
            .with("severity", self.severity.as_str())
            .with("required_agents", self.required_agents)
            .with("priority", self.priority.as_str())
    }
}

/// A field agent's current assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRecord {
    /// Where the agent was sent.
    pub location: Position,
    /// Disaster kind.
    pub mission_type: String,
    /// Priority passed in the request.
    pub priority: String,
    /// Last known status: `dispatched`, `accepted`, or what the agent
    /// reported.
    pub status: String,
    /// Conversation the mission lives in.
    pub conversation_id: ConversationId,
    /// Agents that already refused this mission.
    pub declined_by: BTreeSet<AgentId>,
}

/// A finding reported by a field agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Reporting agent.
    pub agent: AgentId,
    /// What was found.
    pub finding: String,
    /// Where, if reported.
    pub location: Option<Position>,
    /// Whether the agent flagged it critical.
    pub critical: bool,
}

/// Domain data of a coordinator.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    /// Field agents under this coordinator, in registration order.
    pub field_agents: Vec<AgentId>,
    /// Active missions by field agent.
    pub active_missions: BTreeMap<AgentId, MissionRecord>,
    /// Every assessed report.
    pub situation_reports: Vec<DisasterReport>,
    /// Every discovery received.
    pub discoveries: Vec<Discovery>,
}

impl Coordinator {
    /// One line per active mission.
    pub fn mission_summary(&self) -> String {
        if self.active_missions.is_empty() {
            return String::from("No active missions");
        }
        let mut out = format!("Active missions: {}", self.active_missions.len());
        for (agent, mission) in &self.active_missions {
            let _ = write!(
                out,
                "\n  - {agent}: {} at {} ({})",
                mission.mission_type, mission.location, mission.status
            );
        }
        out
    }
}

impl Domain for Coordinator {
    type State = CoordinatorState;

    fn is_busy(&self, _state: CoordinatorState) -> bool {
        !self.active_missions.is_empty()
    }
}

/// A coordinator agent.
pub type CoordinatorAgent = CommunicatingAgent<Coordinator>;

type Rule = TransitionRule<CoordinatorAgent, CoordinatorState>;

/// Build a coordinator with its rules and message handlers.
pub fn coordinator_agent(id: impl Into<AgentId>, name: impl Into<String>) -> CoordinatorAgent {
    let mut agent = CommunicatingAgent::new(id, name, CoordinatorState::Idle, Coordinator::default());

    for from in [
        CoordinatorState::Idle,
        CoordinatorState::Coordinating,
        CoordinatorState::Monitoring,
        CoordinatorState::Completed,
    ] {
        agent.register_transition(
            Rule::fallible(from, CoordinatorState::Coordinating, |_: &CoordinatorAgent, event| {
                match event {
                    Some(e) if e.is(events::DISASTER_REPORTED) => {
                        DisasterReport::from_event(e).map(|_| true)
                    }
                    _ => Ok(false),
                }
            })
            .with_action(respond_to_disaster)
            .named(format!("{from} -> COORDINATING on disaster")),
        );
    }
    agent.register_transition(Rule::on_event(
        CoordinatorState::Coordinating,
        CoordinatorState::Monitoring,
        &[events::AGENTS_DISPATCHED],
    ));
    agent.register_transition(
        Rule::on_event(
            CoordinatorState::Monitoring,
            CoordinatorState::Completed,
            &[events::ALL_MISSIONS_COMPLETE],
        )
        .with_action(|agent: &mut CoordinatorAgent, _| {
            agent
                .kernel_mut()
                .trace("All missions completed");
        }),
    );

    agent.register_message_handler(Performative::Inform, handle_inform);
    agent.register_message_handler(Performative::Agree, handle_agree);
    agent.register_message_handler(Performative::Refuse, handle_refuse);
    agent.register_message_handler(Performative::Confirm, |agent, msg| {
        agent.kernel_mut().trace(format!(
            "Received confirmation from {}: {}",
            msg.sender(),
            msg.content()
        ));
        Ok(())
    });

    agent.kernel_mut().trace("Coordinator agent initialized");
    agent
}

// ---------------------------------------------------------------------------
// Coordination operations
// ---------------------------------------------------------------------------

/// Put `field_agent` under this coordinator. Registering twice is a no-op.
pub fn register_field_agent(agent: &mut CoordinatorAgent, field_agent: impl Into<AgentId>) {
    let field_agent = field_agent.into();
    if agent.domain().field_agents.contains(&field_agent) {
        return;
    }
    agent
        .kernel_mut()
        .trace(format!("Registered field agent: {field_agent}"));
    agent.domain_mut().field_agents.push(field_agent);
}

/// Record `report` in the situation log.
pub fn assess_situation(agent: &mut CoordinatorAgent, report: &DisasterReport) {
    agent.kernel_mut().trace(format!(
        "Assessing disaster situation: {} at {} (severity {}, {} agents required)",
        report.kind, report.location, report.severity, report.required_agents
    ));
    agent.domain_mut().situation_reports.push(report.clone());
}

/// Send an `investigate_location` request to each free field agent, in
/// registration order, up to `report.required_agents`. Returns how many
/// were dispatched.
pub fn dispatch_field_agents(agent: &mut CoordinatorAgent, report: &DisasterReport) -> usize {
    let free: Vec<AgentId> = agent
        .domain()
        .field_agents
        .iter()
        .filter(|id| !agent.domain().active_missions.contains_key(*id))
        .take(report.required_agents)
        .cloned()
        .collect();

    let mut dispatched = 0_usize;
    for field_agent in free {
        let record = MissionRecord {
            location: report.location,
            mission_type: report.kind.clone(),
            priority: report.priority.clone(),
            status: String::from("dispatched"),
            conversation_id: ConversationId::new(),
            declined_by: BTreeSet::new(),
        };
        match send_assignment(agent, &field_agent, record) {
            Ok(()) => dispatched = dispatched.saturating_add(1),
            Err(err) => {
                warn!(agent = %agent.id(), field_agent = %field_agent, error = %err, "Dispatch failed");
            }
        }
    }

    if dispatched > 0 {
        agent.kernel_mut().trace(format!(
            "Dispatched {dispatched} agents. Now monitoring operations."
        ));
    } else {
        agent
            .kernel_mut()
            .trace("WARNING: No available field agents to dispatch");
    }
    dispatched
}

/// Ask `field_agent` for its mission status.
pub fn request_status_update(agent: &mut CoordinatorAgent, field_agent: &AgentId) -> Result<MessageId, MessageError> {
    let id = agent.send(
        Performative::QueryIf,
        field_agent.clone(),
        json!({"query": "mission_status", "agent": field_agent}),
    )?;
    agent
        .kernel_mut()
        .trace(format!("Requested status update from {field_agent}"));
    Ok(id)
}

fn send_assignment(agent: &mut CoordinatorAgent, field_agent: &AgentId, record: MissionRecord) -> Result<(), MessageError> {
    let request = Message::new(
        Performative::Request,
        agent.id().clone(),
        field_agent.clone(),
        json!({
            "action": "investigate_location",
            "parameters": {
                "location": record.location.to_value(),
                "mission_type": record.mission_type,
                "priority": record.priority,
            },
        }),
    )
    .with_tags(agent.message_tags())
    .in_conversation(record.conversation_id);
    agent.send_message(request)?;
    agent.kernel_mut().trace(format!(
        "Dispatched {field_agent} to investigate {}",
        record.location
    ));
    agent
        .domain_mut()
        .active_missions
        .insert(field_agent.clone(), record);
    Ok(())
}

fn respond_to_disaster(agent: &mut CoordinatorAgent, event: Option<&Event>) {
    let Some(Ok(report)) = event.map(DisasterReport::from_event) else {
        return;
    };
    assess_situation(agent, &report);
    if dispatch_field_agents(agent, &report) > 0 {
        agent.receive_event(Event::new(events::AGENTS_DISPATCHED, 5));
    }
}

// ---------------------------------------------------------------------------
// Message handlers
// ---------------------------------------------------------------------------

fn handle_inform(agent: &mut CoordinatorAgent, msg: &Message) -> Result<(), HandlerError> {
    let sender = msg.sender().clone();
    let info = msg.content();
    agent
        .kernel_mut()
        .trace(format!("Received report from {sender}: {info}"));

    match info.get("type").and_then(Value::as_str) {
        Some("discovery") => {
            let finding = info
                .get("discovery")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let location = info.get("location").and_then(Position::from_value);
            let critical = info.get("severity").and_then(Value::as_str) == Some("critical");
            agent.reply(
                msg,
                Performative::Confirm,
                json!({"acknowledged": true, "discovery": finding}),
            )?;
            agent.kernel_mut().trace(format!(
                "Field agent {sender} discovered: {finding}"
            ));
            if critical {
                agent
                    .kernel_mut()
                    .trace("Critical discovery - requesting additional support");
                info!(agent = %agent.id(), field_agent = %sender, finding, "Critical discovery");
            }
            agent.domain_mut().discoveries.push(Discovery {
                agent: sender,
                finding: String::from(finding),
                location,
                critical,
            });
        }
        Some("status_update") => {
            let status = info
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            if let Some(mission) = agent.domain_mut().active_missions.get_mut(&sender) {
                mission.status = String::from(status);
                agent
                    .kernel_mut()
                    .trace(format!("Updated {sender} status: {status}"));
            }
        }
        Some("mission_complete") => {
            agent.kernel_mut().trace(format!(
                "Agent {sender} completed mission: {}",
                info.get("result").unwrap_or(&Value::Null)
            ));
            let removed = agent.domain_mut().active_missions.remove(&sender).is_some();
            if removed && agent.domain().active_missions.is_empty() {
                agent.receive_event(Event::new(events::ALL_MISSIONS_COMPLETE, 5));
            }
        }
        Some("emergency") => {
            agent.kernel_mut().trace(format!(
                "EMERGENCY reported by {sender}: {}",
                info.get("emergency").unwrap_or(&Value::Null)
            ));
            agent.reply(
                msg,
                Performative::Confirm,
                json!({"emergency_acknowledged": true, "support_dispatched": true}),
            )?;
        }
        _ => {}
    }
    Ok(())
}

fn handle_agree(agent: &mut CoordinatorAgent, msg: &Message) -> Result<(), HandlerError> {
    let sender = msg.sender().clone();
    if let Some(mission) = agent.domain_mut().active_missions.get_mut(&sender) {
        mission.status = String::from("accepted");
    }
    agent.kernel_mut().trace(format!(
        "Agent {sender} agreed: {}",
        msg.content()
    ));
    Ok(())
}

fn handle_refuse(agent: &mut CoordinatorAgent, msg: &Message) -> Result<(), HandlerError> {
    let sender = msg.sender().clone();
    let reason = msg
        .content()
        .get("reason")
        .cloned()
        .unwrap_or_else(|| msg.content().clone());
    agent.kernel_mut().trace(format!(
        "Agent {sender} refused request. Reason: {reason}"
    ));

    let Some(mut mission) = agent.domain_mut().active_missions.remove(&sender) else {
        return Ok(());
    };
    mission.declined_by.insert(sender);
    mission.status = String::from("dispatched");

    let replacement = agent
        .domain()
        .field_agents
        .iter()
        .find(|id| !mission.declined_by.contains(*id) && !agent.domain().active_missions.contains_key(*id))
        .cloned();
    match replacement {
        Some(field_agent) => send_assignment(agent, &field_agent, mission)?,
        None => {
            agent.kernel_mut().trace(format!(
                "WARNING: No agent left to take the {} mission at {}",
                mission.mission_type, mission.location
            ));
            if agent.domain().active_missions.is_empty() {
                agent.receive_event(Event::new(events::ALL_MISSIONS_COMPLETE, 5));
            }
        }
    }
    Ok(())
}

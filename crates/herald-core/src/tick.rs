//! Tick cycle: route, then update every agent once.
//!
//! Each tick runs two phases:
//!
//! 1. **Route** -- drain every outbox and deliver by receiver id. Each
//!    routed message, delivered or dropped, is recorded in the message log.
//! 2. **Update** -- call `step` on every participant once, in the fixed
//!    order they were added. Within a participant, domain simulation
//!    happens before message and event processing.
//!
//! Agents interact only through messages and events, so the result does not
//! depend on enumeration order beyond the one-tick delivery delay.

use herald_acl::{MessageLogger, MessageRouter, Participant, RoutingStats};
use herald_types::{AgentId, Event};
use tracing::{debug, info};

/// Errors raised by the stepper.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// No participant has this id.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// A participant with this id is already registered.
    #[error("duplicate agent id: {0}")]
    DuplicateAgent(AgentId),
}

/// One participant's state after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    /// Participant id.
    pub id: AgentId,
    /// Display form of its state.
    pub state: String,
    /// Transitions fired during the tick.
    pub transitions: usize,
    /// Whether it still has queued or in-flight work.
    pub pending_work: bool,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick that just ran, starting at 1.
    pub tick: u64,
    /// Messages delivered in the route phase.
    pub delivered: usize,
    /// Messages dropped in the route phase.
    pub dropped: usize,
    /// Transitions fired across all participants.
    pub transitions: usize,
    /// Per-participant state, in enumeration order.
    pub agents: Vec<AgentSnapshot>,
}

impl TickSummary {
    /// Whether the tick routed nothing, fired nothing, and left every
    /// participant without pending work.
    pub fn is_quiescent(&self) -> bool {
        self.delivered == 0
            && self.dropped == 0
            && self.transitions == 0
            && self.agents.iter().all(|agent| !agent.pending_work)
    }

    /// State label of one participant, if present.
    pub fn state_of(&self, id: &str) -> Option<&str> {
        self.agents
            .iter()
            .find(|agent| agent.id.as_str() == id)
            .map(|agent| agent.state.as_str())
    }
}

/// The cooperative stepper: participants in fixed order, a router, and
/// the message log.
#[derive(Default)]
pub struct Simulation {
    participants: Vec<Box<dyn Participant>>,
    router: MessageRouter,
    log: MessageLogger,
    tick: u64,
}

impl Simulation {
    /// Create an empty simulation at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a participant to the enumeration order.
    pub fn add_participant(&mut self, participant: Box<dyn Participant>) -> Result<(), TickError> {
        let id = participant.participant_id().clone();
        if self.participant(&id).is_some() {
            return Err(TickError::DuplicateAgent(id));
        }
        debug!(agent = %id, "Participant added");
        self.participants.push(participant);
        Ok(())
    }

    /// Queue a stimulus on one participant.
    pub fn inject_event(&mut self, agent_id: &AgentId, event: Event) -> Result<(), TickError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.participant_id() == agent_id)
            .ok_or_else(|| TickError::UnknownAgent(agent_id.clone()))?;
        debug!(agent = %agent_id, event = %event, "Event injected");
        participant.deliver_event(event);
        Ok(())
    }

    /// Execute one tick.
    pub fn run_tick(&mut self) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;

        let report = self.router.route(&mut self.participants);
        let delivered = report.delivered();
        let dropped = report.dropped();
        self.log.log_all(report.into_messages());

        let mut transitions = 0_usize;
        let mut agents = Vec::with_capacity(self.participants.len());
        for participant in &mut self.participants {
            let fired = participant.step();
            transitions = transitions.saturating_add(fired);
            agents.push(AgentSnapshot {
                id: participant.participant_id().clone(),
                state: participant.state_label(),
                transitions: fired,
                pending_work: participant.has_pending_work(),
            });
        }

        info!(tick, delivered, dropped, transitions, "Tick complete");
        TickSummary {
            tick,
            delivered,
            dropped,
            transitions,
            agents,
        }
    }

    /// The last completed tick; 0 before the first.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Participants in enumeration order.
    pub fn participants(&self) -> &[Box<dyn Participant>] {
        &self.participants
    }

    /// One participant by id.
    pub fn participant(&self, id: &AgentId) -> Option<&dyn Participant> {
        self.participants
            .iter()
            .find(|p| p.participant_id() == id)
            .map(AsRef::as_ref)
    }

    /// Every routed message so far.
    pub const fn message_log(&self) -> &MessageLogger {
        &self.log
    }

    /// Delivery counters.
    pub const fn routing_stats(&self) -> RoutingStats {
        self.router.stats()
    }
}

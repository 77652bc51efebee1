//! Kernel state shared by every agent: identity, current state, pending
//! events, goals, state history, and trace.
//!
//! The kernel is pure bookkeeping. Rule evaluation lives in
//! [`machine`](crate::machine); the kernel never inspects or changes goal
//! status on its own.

use core::fmt;

use chrono::{DateTime, Utc};
use herald_types::{AgentId, Event, Goal, GoalStatus};
use serde::Serialize;
use tracing::warn;

use crate::error::KernelError;
use crate::queue::EventQueue;
use crate::trace::TraceSink;

/// Bound satisfied by every domain state enumeration.
pub trait AgentState: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> AgentState for T where T: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// One entry of the append-only state history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRecord<S> {
    /// The state entered.
    pub state: S,
    /// When it was entered.
    pub at: DateTime<Utc>,
    /// Human-readable cause.
    pub reason: String,
}

/// Kernel behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelOptions {
    /// Run one extra rule evaluation with no event after the queue drains
    /// on every `update`.
    pub quiet_step: bool,
}

/// Identity and bookkeeping of one reactive agent.
#[derive(Debug, Clone)]
pub struct Kernel<S> {
    id: AgentId,
    name: String,
    state: S,
    queue: EventQueue,
    goals: Vec<Goal>,
    history: Vec<StateRecord<S>>,
    trace: TraceSink,
    options: KernelOptions,
}

impl<S: AgentState> Kernel<S> {
    /// Create a kernel in `initial` state.
    pub fn new(id: AgentId, name: impl Into<String>, initial: S) -> Self {
        let name = name.into();
        let mut trace = TraceSink::new(id.clone());
        trace.record(format!("Agent {name} initialized in state {initial}"));
        Self {
            id,
            name,
            state: initial,
            queue: EventQueue::new(),
            goals: Vec::new(),
            history: vec![StateRecord {
                state: initial,
                at: Utc::now(),
                reason: String::from("initialized"),
            }],
            trace,
            options: KernelOptions::default(),
        }
    }

    /// The agent's identifier.
    pub const fn id(&self) -> &AgentId {
        &self.id
    }

    /// The agent's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state.
    pub const fn state(&self) -> S {
        self.state
    }

    /// Behaviour switches.
    pub const fn options(&self) -> KernelOptions {
        self.options
    }

    /// Enable or disable the post-drain eventless evaluation.
    pub const fn set_quiet_step(&mut self, enabled: bool) {
        self.options.quiet_step = enabled;
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Queue an event at its priority position.
    pub fn receive_event(&mut self, event: Event) {
        let payload = serde_json::to_string(event.payload()).unwrap_or_default();
        self.trace.record(format!(
            "Event received: {} - {payload}",
            event.event_type()
        ));
        self.queue.push(event);
    }

    /// Remove the next event to process.
    pub fn next_event(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    /// Events waiting to be processed.
    pub const fn pending_events(&self) -> &EventQueue {
        &self.queue
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Enter `to` and append it to the history with `reason`.
    ///
    /// The transition engine calls this after a rule's action has run.
    /// Domain code may call it directly for state changes that are not
    /// driven by an event.
    pub fn enter_state(&mut self, to: S, reason: impl Into<String>) {
        self.state = to;
        self.history.push(StateRecord {
            state: to,
            at: Utc::now(),
            reason: reason.into(),
        });
    }

    /// The state history, oldest first. Starts with the initial state.
    pub fn state_history(&self) -> &[StateRecord<S>] {
        &self.history
    }

    /// Number of transitions recorded since construction.
    pub fn transition_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    // -----------------------------------------------------------------------
    // Trace
    // -----------------------------------------------------------------------

    /// Append a line to the execution trace.
    pub fn trace(&mut self, message: impl AsRef<str>) {
        self.trace.record(message);
    }

    /// The execution trace, oldest first.
    pub fn execution_trace(&self) -> &[String] {
        self.trace.entries()
    }

    /// Mutable access to the trace sink, for domain simulation hooks.
    pub const fn trace_sink(&mut self) -> &mut TraceSink {
        &mut self.trace
    }

    // -----------------------------------------------------------------------
    // Goals
    // -----------------------------------------------------------------------

    /// Take ownership of a goal.
    pub fn add_goal(&mut self, goal: Goal) {
        self.trace.record(format!("Goal added: {}", goal.description));
        self.goals.push(goal);
    }

    /// All goals, in insertion order.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Look up a goal by id.
    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    fn goal_mut(&mut self, id: &str) -> Result<&mut Goal, KernelError> {
        self.goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| KernelError::GoalNotFound(String::from(id)))
    }

    /// The first goal whose status is `Active`.
    ///
    /// By convention at most one goal is active; nothing enforces it.
    pub fn current_goal(&self) -> Option<&Goal> {
        self.goals.iter().find(|g| g.is_active())
    }

    /// Mark a goal active.
    ///
    /// Activating a second goal while another is active is permitted but
    /// logged.
    pub fn activate_goal(&mut self, id: &str) -> Result<(), KernelError> {
        if let Some(current) = self.current_goal().filter(|g| g.id != id) {
            warn!(
                agent = %self.id,
                active = %current.id,
                activating = id,
                "Activating a goal while another is already active"
            );
        }
        self.goal_mut(id)?.activate();
        self.trace.record(format!("Goal activated: {id}"));
        Ok(())
    }

    /// Mark a goal completed. Idempotent on terminal goals apart from the
    /// completion timestamp.
    pub fn complete_goal(&mut self, id: &str) -> Result<(), KernelError> {
        self.goal_mut(id)?.complete();
        self.trace.record(format!("Goal completed: {id}"));
        Ok(())
    }

    /// Mark a goal failed.
    pub fn fail_goal(&mut self, id: &str) -> Result<(), KernelError> {
        self.goal_mut(id)?.fail();
        self.trace.record(format!("Goal failed: {id}"));
        Ok(())
    }

    /// Complete every active goal and return how many changed.
    pub fn complete_active_goals(&mut self) -> usize {
        let mut completed = 0_usize;
        for goal in self.goals.iter_mut().filter(|g| g.status == GoalStatus::Active) {
            goal.complete();
            completed = completed.saturating_add(1);
        }
        if completed > 0 {
            self.trace.record(format!("Completed {completed} active goal(s)"));
        }
        completed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Idle,
        Busy,
    }

    impl fmt::Display for Phase {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Idle => f.write_str("idle"),
                Self::Busy => f.write_str("busy"),
            }
        }
    }

    fn make_kernel() -> Kernel<Phase> {
        Kernel::new(AgentId::new("K-1"), "Kernel One", Phase::Idle)
    }

    #[test]
    fn new_kernel_records_initial_state() {
        let kernel = make_kernel();
        assert_eq!(kernel.state(), Phase::Idle);
        assert_eq!(kernel.state_history().len(), 1);
        assert_eq!(kernel.state_history().first().unwrap().reason, "initialized");
        assert_eq!(kernel.transition_count(), 0);
        assert_eq!(kernel.execution_trace().len(), 1);
    }

    #[test]
    fn enter_state_appends_history() {
        let mut kernel = make_kernel();
        kernel.enter_state(Phase::Busy, "manual");
        assert_eq!(kernel.state(), Phase::Busy);
        assert_eq!(kernel.transition_count(), 1);
        let last = kernel.state_history().last().unwrap();
        assert_eq!(last.state, Phase::Busy);
        assert_eq!(last.reason, "manual");
    }

    #[test]
    fn goal_operations_reject_unknown_ids() {
        let mut kernel = make_kernel();
        assert_eq!(
            kernel.complete_goal("nope"),
            Err(KernelError::GoalNotFound(String::from("nope")))
        );
        assert!(kernel.activate_goal("nope").is_err());
        assert!(kernel.fail_goal("nope").is_err());
    }

    #[test]
    fn current_goal_is_first_active() {
        let mut kernel = make_kernel();
        kernel.add_goal(Goal::new("a", "first", 1));
        kernel.add_goal(Goal::new("b", "second", 2));
        assert!(kernel.current_goal().is_none());

        kernel.activate_goal("b").unwrap();
        assert_eq!(kernel.current_goal().map(|g| g.id.as_str()), Some("b"));

        // Multiple active goals are tolerated; the first one wins.
        kernel.activate_goal("a").unwrap();
        assert_eq!(kernel.current_goal().map(|g| g.id.as_str()), Some("a"));
        assert_eq!(kernel.complete_active_goals(), 2);
        assert!(kernel.current_goal().is_none());
    }

    #[test]
    fn completing_a_completed_goal_is_allowed() {
        let mut kernel = make_kernel();
        kernel.add_goal(Goal::new("g", "goal", 1));
        kernel.complete_goal("g").unwrap();
        let first = kernel.goal("g").unwrap().completed_at;
        kernel.complete_goal("g").unwrap();
        let second = kernel.goal("g").unwrap().completed_at;

        assert_eq!(kernel.goal("g").unwrap().status, GoalStatus::Completed);
        assert!(second >= first);
    }

    #[test]
    fn receive_event_queues_and_traces() {
        let mut kernel = make_kernel();
        kernel.receive_event(Event::new("PING", 1).with("n", 1));
        assert_eq!(kernel.pending_events().len(), 1);
        assert!(
            kernel
                .execution_trace()
                .last()
                .is_some_and(|e| e.contains("Event received: PING"))
        );
        assert!(kernel.next_event().is_some());
        assert!(kernel.next_event().is_none());
    }
}

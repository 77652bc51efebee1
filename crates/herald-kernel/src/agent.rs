//! Kernel-only reactive agent.
//!
//! [`ReactiveAgent`] composes a [`Kernel`], a [`TransitionTable`], and a
//! domain value `D`. Domain types describe their state enumeration and,
//! optionally, one increment of simulation per tick through [`Domain`].

use herald_types::{AgentId, Event};

use crate::kernel::{AgentState, Kernel};
use crate::machine::{self, Reactive};
use crate::rule::{TransitionRule, TransitionTable};
use crate::trace::TraceSink;

/// Domain-specific data carried by an agent.
pub trait Domain: Send + 'static {
    /// The finite state set of this domain.
    type State: AgentState;

    /// Advance one increment of domain simulation for the current state
    /// (movement, timers, resource use). Runs before any event or message
    /// is processed in the same tick. The default does nothing.
    fn advance(&mut self, state: Self::State, trace: &mut TraceSink) {
        let _ = (state, trace);
    }

    /// Whether the domain still has work in flight in `state` (travel,
    /// timers) even though no event is queued. A stepper uses this to tell
    /// a settled agent from one that is merely between stimuli. The default
    /// is `false`.
    fn is_busy(&self, state: Self::State) -> bool {
        let _ = state;
        false
    }
}

/// A reactive agent without messaging.
#[derive(Debug)]
pub struct ReactiveAgent<D: Domain> {
    kernel: Kernel<D::State>,
    transitions: TransitionTable<ReactiveAgent<D>, D::State>,
    domain: D,
}

impl<D: Domain> ReactiveAgent<D> {
    /// Create an agent in `initial` state with no rules.
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, initial: D::State, domain: D) -> Self {
        Self {
            kernel: Kernel::new(id.into(), name, initial),
            transitions: TransitionTable::new(),
            domain,
        }
    }

    /// Append a transition rule.
    pub fn register_transition(&mut self, rule: TransitionRule<Self, D::State>) {
        self.kernel
            .trace(format!("Registered transition {}", rule.label()));
        self.transitions.push(rule);
    }

    /// Queue a stimulus.
    pub fn receive_event(&mut self, event: Event) {
        self.kernel.receive_event(event);
    }

    /// Drain the event queue. Returns the number of transitions fired.
    pub fn process_events(&mut self) -> usize {
        machine::process_events(self)
    }

    /// One tick: advance the domain, drain events, then the optional quiet
    /// step. Returns the number of transitions fired.
    pub fn update(&mut self) -> usize {
        let state = self.kernel.state();
        self.domain.advance(state, self.kernel.trace_sink());
        let fired = machine::process_events(self);
        if machine::quiet_step(self).is_some() {
            fired.saturating_add(1)
        } else {
            fired
        }
    }

    /// Whether queued events or in-flight domain work remain.
    pub fn has_pending_work(&self) -> bool {
        !self.kernel.pending_events().is_empty() || self.domain.is_busy(self.kernel.state())
    }

    /// The current state.
    pub const fn state(&self) -> D::State {
        self.kernel.state()
    }

    /// Domain data.
    pub const fn domain(&self) -> &D {
        &self.domain
    }

    /// Mutable domain data.
    pub const fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    /// Kernel bookkeeping.
    pub const fn kernel(&self) -> &Kernel<D::State> {
        &self.kernel
    }

    /// Mutable kernel bookkeeping.
    pub const fn kernel_mut(&mut self) -> &mut Kernel<D::State> {
        &mut self.kernel
    }
}

impl<D: Domain> Reactive for ReactiveAgent<D> {
    type State = D::State;

    fn kernel(&self) -> &Kernel<D::State> {
        &self.kernel
    }

    fn kernel_mut(&mut self) -> &mut Kernel<D::State> {
        &mut self.kernel
    }

    fn transitions(&self) -> &TransitionTable<Self, D::State> {
        &self.transitions
    }
}

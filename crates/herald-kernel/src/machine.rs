//! The transition engine.
//!
//! Semantics, per dequeued event:
//!
//! 1. Scan the rules in registration order.
//! 2. Skip rules whose source state is not the current state.
//! 3. Evaluate the guard. A guard error is logged and counts as `false`;
//!    scanning continues with the next rule.
//! 4. The first rule whose guard is `true` fires: its action runs, then the
//!    state changes and the history records `(state, time, reason)`.
//! 5. At most one rule fires per event. An event that matches nothing is
//!    consumed silently.

use herald_types::Event;
use tracing::{debug, warn};

use crate::kernel::{AgentState, Kernel};
use crate::rule::TransitionTable;

/// An agent that owns a [`Kernel`] and a [`TransitionTable`] over itself.
pub trait Reactive: Sized {
    /// The domain state enumeration.
    type State: AgentState;

    /// Shared kernel bookkeeping.
    fn kernel(&self) -> &Kernel<Self::State>;

    /// Mutable kernel bookkeeping.
    fn kernel_mut(&mut self) -> &mut Kernel<Self::State>;

    /// Registered rules, in order.
    fn transitions(&self) -> &TransitionTable<Self, Self::State>;
}

/// A transition that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<S> {
    /// State before the transition.
    pub from: S,
    /// State after the transition.
    pub to: S,
}

/// Evaluate the rules once against `event` and fire the first match.
///
/// Returns the transition taken, or `None` if nothing matched.
pub fn react<A: Reactive>(agent: &mut A, event: Option<&Event>) -> Option<Fired<A::State>> {
    let current = agent.kernel().state();
    let mut failures: Vec<String> = Vec::new();
    let mut selected = None;

    for rule in agent.transitions().iter().filter(|r| r.from() == current) {
        match rule.evaluate(agent, event) {
            Ok(true) => {
                selected = Some((rule.to(), rule.action().cloned(), rule.label()));
                break;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(
                    agent = %agent.kernel().id(),
                    rule = %rule.label(),
                    error = %err,
                    "Guard failed; treating as no match"
                );
                failures.push(format!("ERROR: guard '{}' failed: {err}", rule.label()));
            }
        }
    }

    for failure in failures {
        agent.kernel_mut().trace(failure);
    }

    let cause = event.map_or("no event", Event::event_type).to_owned();
    let Some((to, action, label)) = selected else {
        debug!(agent = %agent.kernel().id(), state = %current, cause = %cause, "No transition matched");
        return None;
    };

    if let Some(action) = action {
        action(&mut *agent, event);
    }

    let kernel = agent.kernel_mut();
    kernel.enter_state(to, format!("transition from {current} due to {cause}"));
    kernel.trace(format!(
        "State transition: {current} -> {to} (triggered by {cause})"
    ));
    debug!(agent = %kernel.id(), from = %current, to = %to, rule = %label, "Transition fired");

    Some(Fired { from: current, to })
}

/// Drain the event queue, highest priority first, reacting to each event.
///
/// Returns the number of transitions that fired.
pub fn process_events<A: Reactive>(agent: &mut A) -> usize {
    let mut fired = 0_usize;
    while let Some(event) = agent.kernel_mut().next_event() {
        agent
            .kernel_mut()
            .trace(format!("Processing event: {}", event.event_type()));
        if react(agent, Some(&event)).is_some() {
            fired = fired.saturating_add(1);
        }
    }
    fired
}

/// Run one eventless evaluation if the kernel's `quiet_step` option is on.
pub fn quiet_step<A: Reactive>(agent: &mut A) -> Option<Fired<A::State>> {
    if agent.kernel().options().quiet_step {
        react(agent, None)
    } else {
        None
    }
}

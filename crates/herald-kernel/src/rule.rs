//! Transition rules: a guard and an optional action bound to a
//! `(from, to)` state pair.
//!
//! Rules are generic over the host agent type `A`, so a guard sees the
//! whole agent (domain fields, goals, mailbox) and an action borrows it
//! mutably for the duration of one call.

use core::fmt;
use std::sync::Arc;

use herald_types::Event;

use crate::error::GuardError;
use crate::kernel::AgentState;

/// Predicate deciding whether a rule may fire for `(agent, event-or-none)`.
pub type Guard<A> = Arc<dyn Fn(&A, Option<&Event>) -> Result<bool, GuardError> + Send + Sync>;

/// Side effect run just before the state changes.
pub type Action<A> = Arc<dyn Fn(&mut A, Option<&Event>) + Send + Sync>;

/// A guarded transition between two states.
pub struct TransitionRule<A, S> {
    from: S,
    to: S,
    guard: Guard<A>,
    action: Option<Action<A>>,
    label: Option<String>,
}

impl<A, S: AgentState> TransitionRule<A, S> {
    /// A rule with an infallible guard.
    pub fn new<G>(from: S, to: S, guard: G) -> Self
    where
        G: Fn(&A, Option<&Event>) -> bool + Send + Sync + 'static,
    {
        Self::fallible(from, to, move |agent, event| Ok(guard(agent, event)))
    }

    /// A rule whose guard may fail. A failure counts as "no match".
    pub fn fallible<G>(from: S, to: S, guard: G) -> Self
    where
        G: Fn(&A, Option<&Event>) -> Result<bool, GuardError> + Send + Sync + 'static,
    {
        Self {
            from,
            to,
            guard: Arc::new(guard),
            action: None,
            label: None,
        }
    }

    /// A rule whose guard is constantly true.
    pub fn always(from: S, to: S) -> Self {
        Self::new(from, to, |_, _| true)
    }

    /// A rule that fires when the event's type is one of `event_types`.
    /// Never fires without an event.
    pub fn on_event(from: S, to: S, event_types: &[&str]) -> Self {
        let accepted: Vec<String> = event_types.iter().map(|t| String::from(*t)).collect();
        Self::new(from, to, move |_, event| {
            event.is_some_and(|e| accepted.iter().any(|t| e.is(t)))
        })
    }

    /// Attach the action to run before the state changes.
    #[must_use]
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut A, Option<&Event>) + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Attach a label used in logs.
    #[must_use]
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Source state.
    pub const fn from(&self) -> S {
        self.from
    }

    /// Destination state.
    pub const fn to(&self) -> S {
        self.to
    }

    /// Label, or `"from -> to"` when none was given.
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{} -> {}", self.from, self.to))
    }

    /// Evaluate the guard.
    pub fn evaluate(&self, agent: &A, event: Option<&Event>) -> Result<bool, GuardError> {
        (self.guard)(agent, event)
    }

    /// The action, if any.
    pub const fn action(&self) -> Option<&Action<A>> {
        self.action.as_ref()
    }
}

impl<A, S: fmt::Debug> fmt::Debug for TransitionRule<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRule")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("label", &self.label)
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

/// The ordered rules of one agent. Registration order is the tie-break
/// among rules that match the same state and event.
pub struct TransitionTable<A, S> {
    rules: Vec<TransitionRule<A, S>>,
}

impl<A, S> TransitionTable<A, S> {
    /// An empty table.
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after every existing one.
    pub fn push(&mut self, rule: TransitionRule<A, S>) {
        self.rules.push(rule);
    }

    /// Rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRule<A, S>> {
        self.rules.iter()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<A, S> Default for TransitionTable<A, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S: fmt::Debug> fmt::Debug for TransitionTable<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}

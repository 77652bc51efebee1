//! Priority-ordered pending event queue.
//!
//! Events are kept sorted by priority, highest first. Insertion is stable:
//! a new event goes after every queued event of equal or higher priority,
//! so ties are served in arrival order.

use std::collections::VecDeque;

use herald_types::Event;

/// Pending events for one agent, ordered for processing.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: VecDeque<Event>,
}

impl EventQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Insert an event at its stable priority position.
    pub fn push(&mut self, event: Event) {
        let priority = event.priority();
        let index = self.pending.partition_point(|queued| queued.priority() >= priority);
        self.pending.insert(index, event);
    }

    /// Remove the highest-priority, earliest-arrived event.
    pub fn pop(&mut self) -> Option<Event> {
        self.pending.pop_front()
    }

    /// The event [`pop`](Self::pop) would return next.
    pub fn peek(&self) -> Option<&Event> {
        self.pending.front()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending events in processing order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.pending.iter()
    }
}

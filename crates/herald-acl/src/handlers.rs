//! Performative-keyed handler table.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use herald_types::Performative;

use crate::error::HandlerError;
use crate::message::Message;

/// Handler invoked for each inbound message of one performative.
///
/// The handler borrows its owning agent mutably for the duration of the
/// call; it may send messages, queue events, or update domain data.
pub type MessageHandler<A> =
    Arc<dyn Fn(&mut A, &Message) -> Result<(), HandlerError> + Send + Sync>;

/// Lookup table from performative to handler. At most one handler per
/// performative; registering again replaces the previous one.
pub struct HandlerTable<A> {
    handlers: BTreeMap<Performative, MessageHandler<A>>,
}

impl<A> HandlerTable<A> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Install `handler` for `performative`. Returns `true` when it
    /// replaced an existing handler.
    pub fn register(&mut self, performative: Performative, handler: MessageHandler<A>) -> bool {
        self.handlers.insert(performative, handler).is_some()
    }

    /// Remove the handler for `performative`. Returns `true` if one was
    /// installed.
    pub fn unregister(&mut self, performative: Performative) -> bool {
        self.handlers.remove(&performative).is_some()
    }

    /// A shared handle on the handler for `performative`.
    pub fn get(&self, performative: Performative) -> Option<MessageHandler<A>> {
        self.handlers.get(&performative).cloned()
    }

    /// Whether a handler is installed for `performative`.
    pub fn contains(&self, performative: Performative) -> bool {
        self.handlers.contains_key(&performative)
    }

    /// Performatives with an installed handler, in tag order.
    pub fn performatives(&self) -> impl Iterator<Item = Performative> + '_ {
        self.handlers.keys().copied()
    }
}

impl<A> Default for HandlerTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for HandlerTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

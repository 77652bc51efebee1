//! The stepper's view of an agent.
//!
//! The simulation drives heterogeneous agents through one object-safe
//! trait. Both agent shapes implement it: [`CommunicatingAgent`] accepts
//! messages, while a kernel-only [`ReactiveAgent`] declines them and the
//! router counts those as dropped.

use herald_kernel::{Domain, ReactiveAgent};
use herald_types::{AgentId, Event};

use crate::agent::CommunicatingAgent;
use crate::message::Message;

/// An agent as seen by the router and the tick loop.
pub trait Participant {
    /// Routing address.
    fn participant_id(&self) -> &AgentId;

    /// Hand over an inbound message. Returns the message back if this
    /// participant cannot take messages.
    fn deliver(&mut self, message: Message) -> Result<(), Message>;

    /// Take every pending outbound message in send order.
    fn collect_outbound(&mut self) -> Vec<Message>;

    /// Queue a stimulus.
    fn deliver_event(&mut self, event: Event);

    /// Run one tick. Returns the number of transitions fired.
    fn step(&mut self) -> usize;

    /// Display form of the current state.
    fn state_label(&self) -> String;

    /// Whether anything is queued (events, inbound or outbound messages)
    /// or the domain reports work in flight.
    fn has_pending_work(&self) -> bool;

    /// Transitions fired since construction.
    fn transition_count(&self) -> usize;
}

impl<D: Domain> Participant for CommunicatingAgent<D> {
    fn participant_id(&self) -> &AgentId {
        self.id()
    }

    fn deliver(&mut self, message: Message) -> Result<(), Message> {
        self.receive_message(message);
        Ok(())
    }

    fn collect_outbound(&mut self) -> Vec<Message> {
        self.take_outbox()
    }

    fn deliver_event(&mut self, event: Event) {
        self.receive_event(event);
    }

    fn step(&mut self) -> usize {
        self.update()
    }

    fn state_label(&self) -> String {
        self.state().to_string()
    }

    fn has_pending_work(&self) -> bool {
        self.has_pending_work()
    }

    fn transition_count(&self) -> usize {
        self.kernel().transition_count()
    }
}

impl<D: Domain> Participant for ReactiveAgent<D> {
    fn participant_id(&self) -> &AgentId {
        self.kernel().id()
    }

    fn deliver(&mut self, message: Message) -> Result<(), Message> {
        Err(message)
    }

    fn collect_outbound(&mut self) -> Vec<Message> {
        Vec::new()
    }

    fn deliver_event(&mut self, event: Event) {
        self.receive_event(event);
    }

    fn step(&mut self) -> usize {
        self.update()
    }

    fn state_label(&self) -> String {
        self.state().to_string()
    }

    fn has_pending_work(&self) -> bool {
        self.has_pending_work()
    }

    fn transition_count(&self) -> usize {
        self.kernel().transition_count()
    }
}

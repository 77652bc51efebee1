//! Inbox, outbox, and message history of one agent.

use std::collections::VecDeque;

use herald_types::{AgentId, ConversationId};

use crate::message::Message;

/// FIFO queues for pending inbound and outbound messages plus the
/// append-only history of everything sent or received.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    owner: AgentId,
    inbox: VecDeque<Message>,
    outbox: VecDeque<Message>,
    history: Vec<Message>,
}

impl Mailbox {
    /// Create an empty mailbox for `owner`.
    pub const fn new(owner: AgentId) -> Self {
        Self {
            owner,
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
            history: Vec::new(),
        }
    }

    /// Queue a received message and record it.
    pub fn push_inbound(&mut self, message: Message) {
        self.history.push(message.clone());
        self.inbox.push_back(message);
    }

    /// Oldest pending inbound message.
    pub fn pop_inbound(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    /// Queue a message for routing and record it.
    pub fn push_outbound(&mut self, message: Message) {
        self.history.push(message.clone());
        self.outbox.push_back(message);
    }

    /// Take every pending outbound message in send order.
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        self.outbox.drain(..).collect()
    }

    /// Pending inbound messages.
    pub fn inbox(&self) -> impl Iterator<Item = &Message> {
        self.inbox.iter()
    }

    /// Pending outbound messages.
    pub fn outbox(&self) -> impl Iterator<Item = &Message> {
        self.outbox.iter()
    }

    /// Number of pending inbound messages.
    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// Number of pending outbound messages.
    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Every message sent or received, in the order it happened.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Messages this mailbox's owner sent.
    pub fn sent(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().filter(|msg| msg.sender() == &self.owner)
    }

    /// Messages addressed to this mailbox's owner.
    pub fn received(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().filter(|msg| msg.receiver() == &self.owner)
    }

    /// Messages belonging to one conversation thread.
    pub fn conversation(&self, conversation_id: ConversationId) -> impl Iterator<Item = &Message> {
        self.history
            .iter()
            .filter(move |msg| msg.conversation_id() == conversation_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_types::Performative;
    use serde_json::json;

    use super::*;

    #[test]
    fn inbox_is_fifo() {
        let mut mailbox = Mailbox::new(AgentId::from("B"));
        for n in 0..3 {
            mailbox.push_inbound(Message::new(Performative::Inform, "A", "B", json!(n)));
        }
        let order: Vec<_> = std::iter::from_fn(|| mailbox.pop_inbound())
            .map(|msg| msg.content().clone())
            .collect();
        assert_eq!(order, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(mailbox.history().len(), 3);
    }

    #[test]
    fn history_splits_by_direction() {
        let mut mailbox = Mailbox::new(AgentId::from("B"));
        let request = Message::new(Performative::Request, "A", "B", json!({"action": "go"}));
        let reply = request.create_reply(Performative::Agree, json!({}), "B");
        mailbox.push_inbound(request.clone());
        mailbox.push_outbound(reply);

        assert_eq!(mailbox.sent().count(), 1);
        assert_eq!(mailbox.received().count(), 1);
        assert_eq!(mailbox.conversation(request.conversation_id()).count(), 2);
        assert_eq!(mailbox.conversation(ConversationId::new()).count(), 0);
    }

    #[test]
    fn draining_the_outbox_keeps_history() {
        let mut mailbox = Mailbox::new(AgentId::from("A"));
        mailbox.push_outbound(Message::new(Performative::Inform, "A", "B", json!(1)));
        mailbox.push_outbound(Message::new(Performative::Inform, "A", "C", json!(2)));

        let drained = mailbox.drain_outbox();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained.first().unwrap().receiver().as_str(), "B");
        assert_eq!(mailbox.outbox_len(), 0);
        assert_eq!(mailbox.history().len(), 2);
    }
}

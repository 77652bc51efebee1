//! Reactive agent with speech-act messaging.
//!
//! [`CommunicatingAgent`] adds a [`Mailbox`] and a [`HandlerTable`] to the
//! kernel. Inbound messages are drained strictly FIFO. A message with no
//! handler, or whose handler fails, is answered with exactly one
//! `not-understood` reply carrying the reason and the original message id.
//! An inbound `not-understood` is never answered that way, so two agents
//! without handlers cannot bounce replies forever.

use std::sync::Arc;

use herald_kernel::{Domain, Kernel, Reactive, TransitionRule, TransitionTable, machine};
use herald_types::{AgentId, ConversationId, Event, MessageId, Performative};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{DispatchError, HandlerError, MessageError};
use crate::handlers::{HandlerTable, MessageHandler};
use crate::mailbox::Mailbox;
use crate::message::{Message, MessageTags};
use crate::parser::MessageParser;

/// An agent that reacts to events and exchanges messages.
#[derive(Debug)]
pub struct CommunicatingAgent<D: Domain> {
    kernel: Kernel<D::State>,
    transitions: TransitionTable<CommunicatingAgent<D>, D::State>,
    handlers: HandlerTable<CommunicatingAgent<D>>,
    mailbox: Mailbox,
    tags: MessageTags,
    domain: D,
}

impl<D: Domain> CommunicatingAgent<D> {
    /// Create an agent in `initial` state with the default handler set.
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, initial: D::State, domain: D) -> Self {
        let id = id.into();
        let mut agent = Self {
            kernel: Kernel::new(id.clone(), name, initial),
            transitions: TransitionTable::new(),
            handlers: HandlerTable::new(),
            mailbox: Mailbox::new(id),
            tags: MessageTags::default(),
            domain,
        };
        agent.install_default_handlers();
        agent.kernel.trace("Communication capabilities initialized");
        agent
    }

    fn install_default_handlers(&mut self) {
        for performative in [
            Performative::Inform,
            Performative::Confirm,
            Performative::Disconfirm,
            Performative::QueryIf,
            Performative::Refuse,
            Performative::NotUnderstood,
        ] {
            let handler: MessageHandler<Self> = Arc::new(trace_only::<D>);
            self.handlers.register(performative, handler);
        }
        let handler: MessageHandler<Self> = Arc::new(refuse_request::<D>);
        self.handlers.register(Performative::Request, handler);
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Append a transition rule.
    pub fn register_transition(&mut self, rule: TransitionRule<Self, D::State>) {
        self.kernel
            .trace(format!("Registered transition {}", rule.label()));
        self.transitions.push(rule);
    }

    /// Install or replace the handler for `performative`.
    pub fn register_message_handler<F>(&mut self, performative: Performative, handler: F)
    where
        F: Fn(&mut Self, &Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let handler: MessageHandler<Self> = Arc::new(handler);
        self.handlers.register(performative, handler);
        self.kernel
            .trace(format!("Registered handler for {performative}"));
    }

    /// Remove the handler for `performative`. Messages of that kind are
    /// answered with `not-understood` from then on.
    pub fn unregister_message_handler(&mut self, performative: Performative) -> bool {
        let removed = self.handlers.unregister(performative);
        if removed {
            self.kernel
                .trace(format!("Unregistered handler for {performative}"));
        }
        removed
    }

    /// Tags stamped on conversations this agent starts with [`Self::send`].
    pub fn set_message_tags(&mut self, tags: MessageTags) {
        self.tags = tags;
    }

    /// Tags stamped on conversations this agent starts.
    pub const fn message_tags(&self) -> &MessageTags {
        &self.tags
    }

    /// Whether a handler is installed for `performative`.
    pub fn handles(&self, performative: Performative) -> bool {
        self.handlers.contains(performative)
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Validate `message` and queue it for routing.
    ///
    /// An invalid message is never queued.
    pub fn send_message(&mut self, message: Message) -> Result<MessageId, MessageError> {
        if let Err(err) = message.validate() {
            self.kernel.trace(format!("ERROR: Invalid message - {err}"));
            warn!(agent = %self.kernel.id(), error = %err, "Rejected outbound message");
            return Err(err);
        }
        let id = message.message_id();
        self.kernel.trace(format!(
            "SENT {} to {}: {}",
            message.performative().as_str().to_uppercase(),
            message.receiver(),
            message.content()
        ));
        debug!(
            agent = %self.kernel.id(),
            performative = %message.performative(),
            receiver = %message.receiver(),
            "Message queued"
        );
        self.mailbox.push_outbound(message);
        Ok(id)
    }

    /// Start a new conversation with `receiver`, stamped with this agent's
    /// message tags.
    pub fn send(
        &mut self,
        performative: Performative,
        receiver: impl Into<AgentId>,
        content: Value,
    ) -> Result<MessageId, MessageError> {
        let message = Message::new(performative, self.kernel.id().clone(), receiver, content)
            .with_tags(&self.tags);
        self.send_message(message)
    }

    /// Answer `original` within its conversation.
    pub fn reply(
        &mut self,
        original: &Message,
        performative: Performative,
        content: Value,
    ) -> Result<MessageId, MessageError> {
        let reply = original.create_reply(performative, content, self.kernel.id().clone());
        self.send_message(reply)
    }

    /// Take every queued outbound message, oldest first.
    pub fn take_outbox(&mut self) -> Vec<Message> {
        self.mailbox.drain_outbox()
    }

    // -----------------------------------------------------------------------
    // Receiving
    // -----------------------------------------------------------------------

    /// Queue an inbound message.
    pub fn receive_message(&mut self, message: Message) {
        self.kernel.trace(format!(
            "RECEIVED {} from {}: {}",
            message.performative().as_str().to_uppercase(),
            message.sender(),
            message.content()
        ));
        self.mailbox.push_inbound(message);
    }

    /// Queue a stimulus.
    pub fn receive_event(&mut self, event: Event) {
        self.kernel.receive_event(event);
    }

    /// Drain the inbox in arrival order. Returns the number of messages
    /// processed.
    pub fn process_messages(&mut self) -> usize {
        let mut processed = 0_usize;
        while let Some(message) = self.mailbox.pop_inbound() {
            self.kernel
                .trace(format!("Processing message: {}", message.message_id()));
            if let Err(err) = self.dispatch(&message) {
                self.answer_not_understood(&message, &err);
            }
            processed = processed.saturating_add(1);
        }
        processed
    }

    fn dispatch(&mut self, message: &Message) -> Result<(), DispatchError> {
        let performative = message.performative();
        let handler = self
            .handlers
            .get(performative)
            .ok_or(DispatchError::UnhandledPerformative(performative))?;
        handler(self, message)?;
        Ok(())
    }

    fn answer_not_understood(&mut self, original: &Message, err: &DispatchError) {
        match err {
            DispatchError::UnhandledPerformative(_) => self.kernel.trace(err.to_string()),
            DispatchError::Handler(_) => {
                self.kernel.trace(format!("ERROR in message handler: {err}"));
            }
        }
        if original.performative() == Performative::NotUnderstood {
            warn!(
                agent = %self.kernel.id(),
                sender = %original.sender(),
                "Dropping not-understood that could not be handled"
            );
            return;
        }
        let content = json!({
            "reason": err.to_string(),
            "original_message": original.message_id(),
        });
        if let Err(send_err) = self.reply(original, Performative::NotUnderstood, content) {
            warn!(agent = %self.kernel.id(), error = %send_err, "Could not send not-understood");
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// One tick: advance the domain, drain messages, drain events, then the
    /// optional quiet step. Returns the number of transitions fired.
    pub fn update(&mut self) -> usize {
        let state = self.kernel.state();
        self.domain.advance(state, self.kernel.trace_sink());
        self.process_messages();
        let fired = machine::process_events(self);
        if machine::quiet_step(self).is_some() {
            fired.saturating_add(1)
        } else {
            fired
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Whether queued events, queued messages, or in-flight domain work
    /// remain.
    pub fn has_pending_work(&self) -> bool {
        !self.kernel.pending_events().is_empty()
            || self.mailbox.inbox_len() > 0
            || self.mailbox.outbox_len() > 0
            || self.domain.is_busy(self.kernel.state())
    }

    /// The agent id.
    pub const fn id(&self) -> &AgentId {
        self.kernel.id()
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

    /// Inbox, outbox, and history.
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Messages this agent sent.
    pub fn sent_messages(&self) -> Vec<&Message> {
        self.mailbox.sent().collect()
    }

    /// Messages this agent received.
    pub fn received_messages(&self) -> Vec<&Message> {
        self.mailbox.received().collect()
    }

    /// Messages of one conversation, in the order this agent saw them.
    pub fn conversation(&self, conversation_id: ConversationId) -> Vec<&Message> {
        self.mailbox.conversation(conversation_id).collect()
    }
}

impl<D: Domain> Reactive for CommunicatingAgent<D> {
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

// ---------------------------------------------------------------------------
// Default handlers
// ---------------------------------------------------------------------------

#[allow(clippy::unnecessary_wraps)]
fn trace_only<D: Domain>(agent: &mut CommunicatingAgent<D>, message: &Message) -> Result<(), HandlerError> {
    let line = match message.performative() {
        Performative::Inform => format!("Informed: {}", message.content()),
        Performative::QueryIf => format!("Query: {}", message.content()),
        Performative::Confirm => format!("Confirmed: {}", message.content()),
        Performative::Disconfirm => format!("Disconfirmed: {}", message.content()),
        Performative::Refuse => format!("Request refused: {}", message.content()),
        Performative::NotUnderstood => format!("Not understood by {}: {}", message.sender(), message.content()),
        other => format!("{other}: {}", message.content()),
    };
    agent.kernel.trace(line);
    Ok(())
}

fn refuse_request<D: Domain>(agent: &mut CommunicatingAgent<D>, message: &Message) -> Result<(), HandlerError> {
    let action = MessageParser::extract_action(message).unwrap_or_default();
    agent
        .kernel
        .trace(format!("Request to perform action: {action}"));
    agent.reply(
        message,
        Performative::Refuse,
        json!({"reason": "Action not supported", "action": action}),
    )?;
    Ok(())
}

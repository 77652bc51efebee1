//! In-process message delivery.
//!
//! Routing is a two-phase sweep: every participant's outbox is drained in
//! enumeration order, then each message is handed to the participant whose
//! id equals its receiver. Delivery within one sweep therefore never
//! depends on which participant was enumerated first. Messages with no
//! matching receiver, or whose receiver cannot take messages, are dropped
//! and reported; that is not an error.

use tracing::{debug, warn};

use crate::message::Message;
use crate::participant::Participant;

/// What happened to one message in a sweep.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Handed to its receiver.
    Delivered(Message),
    /// Nowhere to go.
    Dropped(Message),
}

impl Routed {
    /// The routed message.
    pub const fn message(&self) -> &Message {
        match self {
            Self::Delivered(message) | Self::Dropped(message) => message,
        }
    }

    /// Take the routed message.
    pub fn into_message(self) -> Message {
        match self {
            Self::Delivered(message) | Self::Dropped(message) => message,
        }
    }

    /// Whether the message reached its receiver.
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Outcome of one routing sweep.
#[derive(Debug, Clone, Default)]
pub struct RoutingReport {
    /// Every message seen in the sweep, in routing order.
    pub routed: Vec<Routed>,
}

impl RoutingReport {
    /// Messages handed to their receiver.
    pub fn delivered(&self) -> usize {
        self.routed.iter().filter(|r| r.is_delivered()).count()
    }

    /// Messages with nowhere to go.
    pub fn dropped(&self) -> usize {
        self.routed.iter().filter(|r| !r.is_delivered()).count()
    }

    /// Total messages seen in the sweep.
    pub fn total(&self) -> usize {
        self.routed.len()
    }

    /// Delivered messages, in routing order.
    pub fn delivered_messages(&self) -> impl Iterator<Item = &Message> {
        self.routed.iter().filter(|r| r.is_delivered()).map(Routed::message)
    }

    /// Every routed message, delivered or dropped, in routing order.
    pub fn into_messages(self) -> impl Iterator<Item = Message> {
        self.routed.into_iter().map(Routed::into_message)
    }
}

/// Running delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingStats {
    /// Messages delivered since construction.
    pub delivered: u64,
    /// Messages dropped since construction.
    pub dropped: u64,
}

/// Delivers queued messages between participants.
#[derive(Debug, Clone, Default)]
pub struct MessageRouter {
    stats: RoutingStats,
}

impl MessageRouter {
    /// Create a router with zeroed counters.
    pub const fn new() -> Self {
        Self {
            stats: RoutingStats {
                delivered: 0,
                dropped: 0,
            },
        }
    }

    /// Drain every outbox and deliver by receiver id.
    pub fn route(&mut self, participants: &mut [Box<dyn Participant>]) -> RoutingReport {
        let pending: Vec<Message> = participants
            .iter_mut()
            .flat_map(|participant| participant.collect_outbound())
            .collect();

        let mut report = RoutingReport::default();
        for message in pending {
            let target = participants
                .iter_mut()
                .find(|participant| participant.participant_id() == message.receiver());
            let outcome = match target {
                Some(participant) => {
                    let copy = message.clone();
                    participant.deliver(message).map(|()| copy)
                }
                None => Err(message),
            };
            match outcome {
                Ok(delivered) => {
                    debug!(
                        performative = %delivered.performative(),
                        sender = %delivered.sender(),
                        receiver = %delivered.receiver(),
                        "Message delivered"
                    );
                    self.stats.delivered = self.stats.delivered.saturating_add(1);
                    report.routed.push(Routed::Delivered(delivered));
                }
                Err(undeliverable) => {
                    warn!(
                        performative = %undeliverable.performative(),
                        receiver = %undeliverable.receiver(),
                        "Message dropped: no receiver accepts it"
                    );
                    self.stats.dropped = self.stats.dropped.saturating_add(1);
                    report.routed.push(Routed::Dropped(undeliverable));
                }
            }
        }
        report
    }

    /// Counters since construction.
    pub const fn stats(&self) -> RoutingStats {
        self.stats
    }
}

//! Speech-act messaging for Herald agents.
//!
//! Messages carry a performative, free-form JSON content, and conversation
//! linkage. A [`CommunicatingAgent`] drains its inbox in arrival order and
//! dispatches each message to the handler registered for its performative;
//! anything it cannot handle is answered with `not-understood` so the
//! other side of the conversation never waits forever.
//!
//! # Modules
//!
//! - [`agent`] -- [`CommunicatingAgent`]: kernel plus mailbox plus handlers
//! - [`error`] -- [`MessageError`], [`HandlerError`], [`DispatchError`]
//! - [`handlers`] -- Performative-keyed [`HandlerTable`]
//! - [`logger`] -- [`MessageLogger`] and its JSON report
//! - [`mailbox`] -- Inbox, outbox, and history
//! - [`message`] -- The [`Message`] envelope and its wire form
//! - [`parser`] -- [`MessageParser`] content interpretation
//! - [`participant`] -- The [`Participant`] seam used by the stepper
//! - [`router`] -- In-process [`MessageRouter`]

pub mod agent;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod mailbox;
pub mod message;
pub mod parser;
pub mod participant;
pub mod router;

pub use agent::CommunicatingAgent;
pub use error::{DispatchError, HandlerError, MessageError};
pub use handlers::{HandlerTable, MessageHandler};
pub use logger::{MessageLogReport, MessageLogger, MessageStatistics, ReportMetadata};
pub use mailbox::Mailbox;
pub use message::{DEFAULT_LANGUAGE, DEFAULT_ONTOLOGY, DEFAULT_PROTOCOL, Message, MessageTags};
pub use parser::{MessageParser, ParsedContent};
pub use participant::Participant;
pub use router::{MessageRouter, Routed, RoutingReport, RoutingStats};

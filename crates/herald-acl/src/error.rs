//! Error types for the herald-acl crate.
//!
//! [`MessageError`] aborts a send or a decode. [`HandlerError`] and
//! [`DispatchError`] never escape the inbox drain: they are rendered into a
//! `not-understood` reply to the original sender and the drain continues.

use herald_types::{ParsePerformativeError, Performative};

/// A message could not be built, validated, or decoded.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// A required field is missing or the content does not fit the
    /// performative.
    #[error("invalid message: {reason}")]
    InvalidMessage {
        /// Which rule the message broke.
        reason: String,
    },

    /// The wire form named a performative outside the closed set.
    #[error(transparent)]
    UnknownPerformative(#[from] ParsePerformativeError),

    /// The wire form was not valid JSON for a message.
    #[error("message codec error: {source}")]
    Codec {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

impl MessageError {
    /// Shorthand for [`MessageError::InvalidMessage`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }
}

/// A message handler could not complete.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler rejected the message content.
    #[error("{reason}")]
    Failed {
        /// Text carried back in the `not-understood` reply.
        reason: String,
    },

    /// The handler tried to send an invalid message.
    #[error("handler could not send: {source}")]
    Message {
        /// The underlying send error.
        #[from]
        source: MessageError,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Why an inbound message was answered with `not-understood`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler is registered for the performative.
    #[error("No handler for {0}")]
    UnhandledPerformative(Performative),

    /// The registered handler failed.
    #[error("{0}")]
    Handler(#[from] HandlerError),
}

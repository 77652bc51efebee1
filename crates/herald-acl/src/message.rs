//! The speech-act message envelope.
//!
//! A [`Message`] is built once and never mutated. Continuing a
//! conversation is only done through [`Message::create_reply`], which keeps
//! the conversation id and links the reply to the original message.
//!
//! # Wire form
//!
//! JSON object with `message_id`, `performative` (lower-kebab-case),
//! `sender`, `receiver`, `content`, `language`, `ontology`, `protocol`,
//! `conversation_id`, `reply_to`, `in_reply_to`, and `timestamp`
//! (RFC 3339). Encoding then decoding yields a field-equal message.

use core::fmt;

use chrono::{DateTime, Utc};
use herald_types::{AgentId, ConversationId, MessageId, Performative};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::MessageError;

/// Default content language tag.
pub const DEFAULT_LANGUAGE: &str = "json";

/// Default ontology tag.
pub const DEFAULT_ONTOLOGY: &str = "disaster-response";

/// Default interaction protocol tag.
pub const DEFAULT_PROTOCOL: &str = "fipa-request";

fn default_language() -> String {
    String::from(DEFAULT_LANGUAGE)
}

fn default_ontology() -> String {
    String::from(DEFAULT_ONTOLOGY)
}

fn default_protocol() -> String {
    String::from(DEFAULT_PROTOCOL)
}

/// The opaque language, ontology, and protocol tags stamped on new
/// conversations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTags {
    /// Content language tag.
    pub language: String,
    /// Ontology tag.
    pub ontology: String,
    /// Interaction protocol tag.
    pub protocol: String,
}

impl Default for MessageTags {
    fn default() -> Self {
        Self {
            language: default_language(),
            ontology: default_ontology(),
            protocol: default_protocol(),
        }
    }
}

/// An inter-agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Message {
    #[serde(default)]
    message_id: MessageId,
    performative: Performative,
    #[serde(default)]
    sender: AgentId,
    #[serde(default)]
    receiver: AgentId,
    #[serde(default)]
    content: Value,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_ontology")]
    ontology: String,
    #[serde(default = "default_protocol")]
    protocol: String,
    #[serde(default)]
    conversation_id: ConversationId,
    #[serde(default)]
    reply_to: Option<MessageId>,
    #[serde(default)]
    in_reply_to: Option<MessageId>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message that starts a new conversation.
    pub fn new(
        performative: Performative,
        sender: impl Into<AgentId>,
        receiver: impl Into<AgentId>,
        content: Value,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            performative,
            sender: sender.into(),
            receiver: receiver.into(),
            content,
            language: default_language(),
            ontology: default_ontology(),
            protocol: default_protocol(),
            conversation_id: ConversationId::new(),
            reply_to: None,
            in_reply_to: None,
            timestamp: Utc::now(),
        }
    }

    /// Builder: place the message in an existing conversation.
    #[must_use]
    pub const fn in_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    /// Builder: set the content language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Builder: set the ontology tag.
    #[must_use]
    pub fn with_ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = ontology.into();
        self
    }

    /// Builder: set the protocol tag.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Builder: set all three opaque tags at once.
    #[must_use]
    pub fn with_tags(mut self, tags: &MessageTags) -> Self {
        self.language.clone_from(&tags.language);
        self.ontology.clone_from(&tags.ontology);
        self.protocol.clone_from(&tags.protocol);
        self
    }

    /// Builder: ask that replies reference `message_id`.
    #[must_use]
    pub const fn with_reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    /// Build the reply to this message.
    ///
    /// The reply goes back to this message's sender, keeps language,
    /// ontology, protocol, and conversation id, and sets `in_reply_to` to
    /// this message's id.
    pub fn create_reply(
        &self,
        performative: Performative,
        content: Value,
        sender: impl Into<AgentId>,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            performative,
            sender: sender.into(),
            receiver: self.sender.clone(),
            content,
            language: self.language.clone(),
            ontology: self.ontology.clone(),
            protocol: self.protocol.clone(),
            conversation_id: self.conversation_id,
            reply_to: None,
            in_reply_to: Some(self.message_id),
            timestamp: Utc::now(),
        }
    }

    /// Check required fields and performative-specific content rules.
    ///
    /// A `request` must carry an object content with an `action` field.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.sender.is_empty() {
            return Err(MessageError::invalid("Sender is required"));
        }
        if self.receiver.is_empty() {
            return Err(MessageError::invalid("Receiver is required"));
        }
        if self.content.is_null() {
            return Err(MessageError::invalid("Content is required"));
        }
        if self.performative == Performative::Request
            && self.content.get("action").is_none()
        {
            return Err(MessageError::invalid(
                "request performative requires content with an 'action' field",
            ));
        }
        Ok(())
    }

    /// Encode to the JSON wire form.
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from the JSON wire form and validate.
    ///
    /// Fields other than `performative`, `sender`, `receiver`, and
    /// `content` fall back to their defaults when absent.
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        let raw: Value = serde_json::from_str(json)?;
        match raw.get("performative") {
            Some(Value::String(tag)) => {
                tag.parse::<Performative>()?;
            }
            Some(_) => return Err(MessageError::invalid("Performative must be a string")),
            None => return Err(MessageError::invalid("Performative is required")),
        }
        let message: Self = serde_json::from_value(raw)?;
        message.validate()?;
        Ok(message)
    }

    /// Unique id.
    pub const fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Speech-act tag.
    pub const fn performative(&self) -> Performative {
        self.performative
    }

    /// Sending agent.
    pub const fn sender(&self) -> &AgentId {
        &self.sender
    }

    /// Addressed agent.
    pub const fn receiver(&self) -> &AgentId {
        &self.receiver
    }

    /// Content; its shape depends on the performative.
    pub const fn content(&self) -> &Value {
        &self.content
    }

    /// Content language tag.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Ontology tag.
    pub fn ontology(&self) -> &str {
        &self.ontology
    }

    /// Protocol tag.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Conversation thread id.
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Message replies should reference, if requested.
    pub const fn reply_to(&self) -> Option<MessageId> {
        self.reply_to
    }

    /// Message this one answers.
    pub const fn in_reply_to(&self) -> Option<MessageId> {
        self.in_reply_to
    }

    /// Creation time.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} -> {} {}",
            self.timestamp.format("%H:%M:%S"),
            self.performative.as_str().to_uppercase(),
            self.sender,
            self.receiver,
            self.content
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn make_request() -> Message {
        Message::new(
            Performative::Request,
            "COORD-001",
            "FIELD-001",
            json!({"action": "investigate_location", "parameters": {"location": [25, 30]}}),
        )
    }

    #[test]
    fn new_message_uses_defaults() {
        let msg = make_request();
        assert_eq!(msg.language(), DEFAULT_LANGUAGE);
        assert_eq!(msg.ontology(), DEFAULT_ONTOLOGY);
        assert_eq!(msg.protocol(), DEFAULT_PROTOCOL);
        assert!(msg.in_reply_to().is_none());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn tags_apply_together() {
        let tags = MessageTags {
            language: String::from("fipa-sl"),
            ontology: String::from("flood-response"),
            protocol: String::from("fipa-query"),
        };
        let msg = make_request().with_tags(&tags);
        assert_eq!(msg.language(), "fipa-sl");
        assert_eq!(msg.ontology(), "flood-response");
        assert_eq!(msg.protocol(), "fipa-query");
    }

    #[test]
    fn fresh_messages_get_fresh_conversations() {
        let a = make_request();
        let b = make_request();
        assert_ne!(a.message_id(), b.message_id());
        assert_ne!(a.conversation_id(), b.conversation_id());
    }

    #[test]
    fn reply_threads_the_conversation() {
        let request = make_request().with_protocol("fipa-query");
        let reply = request.create_reply(Performative::Agree, json!({"ok": true}), "FIELD-001");

        assert_eq!(reply.receiver(), request.sender());
        assert_eq!(reply.sender().as_str(), "FIELD-001");
        assert_eq!(reply.conversation_id(), request.conversation_id());
        assert_eq!(reply.in_reply_to(), Some(request.message_id()));
        assert_eq!(reply.protocol(), "fipa-query");
        assert_ne!(reply.message_id(), request.message_id());
    }

    #[test]
    fn reply_chains_keep_one_conversation() {
        let first = make_request();
        let second = first.create_reply(Performative::Agree, json!({}), "FIELD-001");
        let third = second.create_reply(Performative::Confirm, json!({}), "COORD-001");

        assert_eq!(third.conversation_id(), first.conversation_id());
        assert_eq!(third.in_reply_to(), Some(second.message_id()));
        assert_eq!(third.receiver().as_str(), "FIELD-001");
    }

    #[test]
    fn request_without_action_is_invalid() {
        let msg = Message::new(Performative::Request, "A", "B", json!({"parameters": {}}));
        let err = msg.validate().unwrap_err();
        assert!(matches!(err, MessageError::InvalidMessage { .. }));

        let not_object = Message::new(Performative::Request, "A", "B", json!("investigate"));
        assert!(not_object.validate().is_err());
    }

    #[test]
    fn missing_fields_are_invalid() {
        assert!(Message::new(Performative::Inform, "", "B", json!(1)).validate().is_err());
        assert!(Message::new(Performative::Inform, "A", "", json!(1)).validate().is_err());
        assert!(Message::new(Performative::Inform, "A", "B", Value::Null).validate().is_err());
        assert!(Message::new(Performative::Inform, "A", "B", json!(1)).validate().is_ok());
    }

    #[test]
    fn every_performative_survives_the_wire() {
        for performative in Performative::ALL {
            let content = if performative == Performative::Request {
                json!({"action": "assist_agent", "parameters": {"agent_id": "FIELD-002"}})
            } else {
                json!({"type": "status_update", "location": [1, 2], "nested": {"ok": true}})
            };
            let original = Message::new(performative, "COORD-001", "FIELD-002", content)
                .with_reply_to(MessageId::new())
                .create_reply(performative, json!({"action": "echo", "n": 7}), "FIELD-002")
                .with_ontology("custom");

            let json = original.to_json().unwrap();
            let decoded = Message::from_json(&json).unwrap();
            assert_eq!(decoded, original, "round trip failed for {performative}");
        }
    }

    #[test]
    fn wire_uses_kebab_case_tags() {
        let msg = Message::new(Performative::NotUnderstood, "A", "B", json!({"reason": "x"}));
        let wire: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(wire.get("performative").unwrap(), "not-understood");
        assert_eq!(wire.get("sender").unwrap(), "A");
        assert!(wire.get("timestamp").unwrap().is_string());
        assert!(wire.get("in_reply_to").unwrap().is_null());
    }

    #[test]
    fn decoding_rejects_unknown_performative() {
        let json = r#"{"performative": "shout", "sender": "A", "receiver": "B", "content": 1}"#;
        assert!(matches!(
            Message::from_json(json),
            Err(MessageError::UnknownPerformative(_))
        ));
    }

    #[test]
    fn decoding_validates() {
        let missing_sender = r#"{"performative": "inform", "receiver": "B", "content": 1}"#;
        assert!(matches!(
            Message::from_json(missing_sender),
            Err(MessageError::InvalidMessage { .. })
        ));

        let missing_performative = r#"{"sender": "A", "receiver": "B", "content": 1}"#;
        assert!(Message::from_json(missing_performative).is_err());

        let minimal = r#"{"performative": "inform", "sender": "A", "receiver": "B", "content": {"fact": "clear"}}"#;
        let msg = Message::from_json(minimal).unwrap();
        assert_eq!(msg.language(), DEFAULT_LANGUAGE);
        assert_eq!(msg.performative(), Performative::Inform);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            Message::from_json("not json"),
            Err(MessageError::Codec { .. })
        ));
    }
}

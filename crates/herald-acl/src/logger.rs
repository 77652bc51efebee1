//! Message log and exchange statistics.
//!
//! The [`MessageLogger`] records every routed message once, in routing
//! order, and groups messages by conversation. [`MessageLogger::report`]
//! produces a serialisable snapshot for external tooling.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use herald_types::{AgentId, ConversationId, Performative};
use serde::Serialize;

use crate::error::MessageError;
use crate::message::Message;

/// Aggregate counts over a message log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MessageStatistics {
    /// Messages logged.
    pub total_messages: usize,
    /// Distinct conversation threads.
    pub conversations: usize,
    /// Messages per performative tag.
    pub by_performative: BTreeMap<Performative, usize>,
    /// Messages sent per agent.
    pub by_agent: BTreeMap<AgentId, usize>,
}

impl fmt::Display for MessageStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Messages: {}", self.total_messages)?;
        writeln!(f, "Conversations: {}", self.conversations)?;
        writeln!(f, "Messages by Performative:")?;
        let mut by_count: Vec<_> = self.by_performative.iter().collect();
        by_count.sort_by_key(|&(_, count)| Reverse(*count));
        for (performative, count) in by_count {
            writeln!(f, "  - {}: {count}", performative.as_str().to_uppercase())?;
        }
        writeln!(f, "Messages by Agent:")?;
        let mut by_count: Vec<_> = self.by_agent.iter().collect();
        by_count.sort_by_key(|&(_, count)| Reverse(*count));
        for (agent, count) in by_count {
            writeln!(f, "  - {agent}: {count} sent")?;
        }
        Ok(())
    }
}

/// Header of a [`MessageLogReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// When the report was produced.
    pub generated: DateTime<Utc>,
    /// Messages logged.
    pub total_messages: usize,
    /// Distinct conversation threads.
    pub conversations: usize,
}

/// Full snapshot of a message log.
#[derive(Debug, Clone, Serialize)]
pub struct MessageLogReport<'a> {
    /// Report header.
    pub metadata: ReportMetadata,
    /// Aggregate counts.
    pub statistics: MessageStatistics,
    /// Every message in routing order, in wire form.
    pub messages: &'a [Message],
}

/// Append-only log of routed messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLogger {
    messages: Vec<Message>,
    conversations: BTreeMap<ConversationId, Vec<usize>>,
}

impl MessageLogger {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            conversations: BTreeMap::new(),
        }
    }

    /// Record one message.
    pub fn log_message(&mut self, message: Message) {
        let position = self.messages.len();
        self.conversations
            .entry(message.conversation_id())
            .or_default()
            .push(position);
        self.messages.push(message);
    }

    /// Record several messages in order.
    pub fn log_all(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.log_message(message);
        }
    }

    /// Every logged message, in routing order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of logged messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages the agent sent or received.
    pub fn by_agent(&self, agent: &AgentId) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|msg| msg.sender() == agent || msg.receiver() == agent)
            .collect()
    }

    /// Messages with the given performative.
    pub fn by_performative(&self, performative: Performative) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|msg| msg.performative() == performative)
            .collect()
    }

    /// Messages of one conversation, in routing order.
    pub fn conversation(&self, conversation_id: ConversationId) -> Vec<&Message> {
        self.conversations
            .get(&conversation_id)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|&position| self.messages.get(position))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct conversation ids, oldest first.
    pub fn conversation_ids(&self) -> impl Iterator<Item = ConversationId> + '_ {
        self.conversations.keys().copied()
    }

    /// Aggregate counts.
    pub fn statistics(&self) -> MessageStatistics {
        let mut stats = MessageStatistics {
            total_messages: self.messages.len(),
            conversations: self.conversations.len(),
            ..MessageStatistics::default()
        };
        for msg in &self.messages {
            let count = stats.by_performative.entry(msg.performative()).or_default();
            *count = count.saturating_add(1);
            let sent = stats.by_agent.entry(msg.sender().clone()).or_default();
            *sent = sent.saturating_add(1);
        }
        stats
    }

    /// Snapshot of the whole log.
    pub fn report(&self) -> MessageLogReport<'_> {
        MessageLogReport {
            metadata: ReportMetadata {
                generated: Utc::now(),
                total_messages: self.messages.len(),
                conversations: self.conversations.len(),
            },
            statistics: self.statistics(),
            messages: &self.messages,
        }
    }

    /// The report rendered as pretty JSON.
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }
}

//! Per-agent execution trace.
//!
//! Each agent owns its [`TraceSink`]; there is no global logger. Every
//! entry is appended to the agent's own ordered trace and mirrored to
//! `tracing` so it also shows up in process logs.

use chrono::Utc;
use herald_types::AgentId;
use tracing::debug;

/// Append-only trace owned by one agent.
#[derive(Debug, Clone)]
pub struct TraceSink {
    agent_id: AgentId,
    entries: Vec<String>,
}

impl TraceSink {
    /// Create an empty trace for `agent_id`.
    pub const fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            entries: Vec::new(),
        }
    }

    /// Append one timestamped entry.
    pub fn record(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.entries
            .push(format!("[{timestamp}] [{}] {message}", self.agent_id));
        debug!(agent = %self.agent_id, "{message}");
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

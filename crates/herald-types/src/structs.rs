//! Core value structs: stimuli ([`Event`]) and objectives ([`Goal`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::enums::GoalStatus;
use crate::ids::EventId;

/// Free-form event payload keyed by field name.
pub type Payload = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// An immutable stimulus delivered to an agent's event queue.
///
/// Higher `priority` values are processed first. Once built, an event is
/// never mutated; the `with_*` builders consume and return the value and
/// are meant for construction only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    id: EventId,
    event_type: String,
    payload: Payload,
    priority: i32,
    created_at: DateTime<Utc>,
}

impl Event {
    /// Create an event with an empty payload, stamped now.
    pub fn new(event_type: impl Into<String>, priority: i32) -> Self {
        Self::at(event_type, priority, Utc::now())
    }

    /// Create an event with an explicit creation instant.
    pub fn at(event_type: impl Into<String>, priority: i32, created_at: DateTime<Utc>) -> Self {
        let event_type = event_type.into();
        Self {
            id: EventId::derive(&event_type, created_at),
            event_type,
            payload: Payload::new(),
            priority,
            created_at,
        }
    }

    /// Builder: add one payload field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Builder: replace the whole payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Identifier derived from type and creation time.
    pub const fn id(&self) -> &EventId {
        &self.id
    }

    /// The type tag guards match on.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Whether the type tag equals `event_type`.
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }

    /// The whole payload.
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// A single payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// A payload field as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// A payload field as a signed integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }

    /// A payload field as a float.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(Value::as_f64)
    }

    /// Processing priority; larger runs first.
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// When the event was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl core::fmt::Display for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}(priority={})", self.event_type, self.priority)
    }
}

// ---------------------------------------------------------------------------
// Goal
// ---------------------------------------------------------------------------

/// A tracked objective owned by exactly one agent.
///
/// Status changes only happen inside that agent's transition actions.
/// `complete` and `fail` may be called on a goal that is already terminal;
/// the status is overwritten and `completed_at` moves to the later call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Goal {
    /// Stable identifier, unique within the owning agent.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Relative importance; larger is more important.
    pub priority: i32,
    /// Current lifecycle status.
    pub status: GoalStatus,
    /// When the goal was created.
    pub created_at: DateTime<Utc>,
    /// When the goal last reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    /// Create a pending goal stamped now.
    pub fn new(id: impl Into<String>, description: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority,
            status: GoalStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark the goal as actively pursued.
    pub const fn activate(&mut self) {
        self.status = GoalStatus::Active;
    }

    /// Mark the goal completed now.
    pub fn complete(&mut self) {
        self.complete_at(Utc::now());
    }

    /// Mark the goal completed at `at`.
    pub fn complete_at(&mut self, at: DateTime<Utc>) {
        self.status = GoalStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Mark the goal failed now.
    pub fn fail(&mut self) {
        self.fail_at(Utc::now());
    }

    /// Mark the goal failed at `at`.
    pub fn fail_at(&mut self, at: DateTime<Utc>) {
        self.status = GoalStatus::Failed;
        self.completed_at = Some(at);
    }

    /// Whether the goal is currently active.
    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }
}

//! Shared type definitions for the Herald reactive agent simulation.
//!
//! This crate is the single source of truth for the value types passed
//! between the agent kernel, the messaging substrate, and the stepper.
//! Types that appear on the message wire are exported to `TypeScript` via
//! `ts-rs` for external reporting tools.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers for agents, events, messages, conversations
//! - [`enums`] -- [`Performative`] and [`GoalStatus`]
//! - [`structs`] -- [`Event`] stimuli and [`Goal`] records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{GoalStatus, ParsePerformativeError, Performative};
pub use ids::{AgentId, ConversationId, EventId, MessageId};
pub use structs::{Event, Goal, Payload};

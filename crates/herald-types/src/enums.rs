//! Enumeration types for the Herald simulation.
//!
//! [`Performative`] is the closed set of FIPA-ACL speech-act tags; its wire
//! form is lower-kebab-case. [`GoalStatus`] is the goal lifecycle.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Performative
// ---------------------------------------------------------------------------

/// The communicative act a message performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Performative {
    /// Inform the receiver that a proposition holds.
    Inform,
    /// Ask the receiver to perform an action.
    Request,
    /// Ask whether a proposition holds.
    QueryIf,
    /// Ask for the object a reference denotes.
    QueryRef,
    /// Confirm that a proposition holds.
    Confirm,
    /// State that a proposition does not hold.
    Disconfirm,
    /// Agree to perform a requested action.
    Agree,
    /// Refuse to perform a requested action.
    Refuse,
    /// Submit a proposal.
    Propose,
    /// Accept a previously submitted proposal.
    AcceptProposal,
    /// Reject a previously submitted proposal.
    RejectProposal,
    /// Call for proposals.
    Cfp,
    /// The previous message could not be handled.
    NotUnderstood,
}

impl Performative {
    /// Every performative, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Inform,
        Self::Request,
        Self::QueryIf,
        Self::QueryRef,
        Self::Confirm,
        Self::Disconfirm,
        Self::Agree,
        Self::Refuse,
        Self::Propose,
        Self::AcceptProposal,
        Self::RejectProposal,
        Self::Cfp,
        Self::NotUnderstood,
    ];

    /// The lower-kebab-case wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inform => "inform",
            Self::Request => "request",
            Self::QueryIf => "query-if",
            Self::QueryRef => "query-ref",
            Self::Confirm => "confirm",
            Self::Disconfirm => "disconfirm",
            Self::Agree => "agree",
            Self::Refuse => "refuse",
            Self::Propose => "propose",
            Self::AcceptProposal => "accept-proposal",
            Self::RejectProposal => "reject-proposal",
            Self::Cfp => "cfp",
            Self::NotUnderstood => "not-understood",
        }
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string did not name a known performative.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown performative: {0}")]
pub struct ParsePerformativeError(pub String);

impl FromStr for Performative {
    type Err = ParsePerformativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParsePerformativeError(String::from(s)))
    }
}

// ---------------------------------------------------------------------------
// GoalStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a [`Goal`](crate::Goal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum GoalStatus {
    /// Not yet pursued.
    #[default]
    Pending,
    /// Currently pursued.
    Active,
    /// Achieved.
    Completed,
    /// Abandoned or failed.
    Failed,
}

impl GoalStatus {
    /// Whether the status is `Completed` or `Failed`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lowercase label, matching the wire form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

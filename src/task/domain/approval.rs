//! Append-only approval history for a task.

use super::{Actor, Role, TaskStatus, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision captured by an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    /// Work was handed in for review.
    Submitted,
    /// A reviewer accepted the work.
    Approved,
    /// A reviewer sent the work back.
    Rejected,
}

impl ApprovalDecision {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one decision in the review pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    decision: ApprovalDecision,
    user_id: UserId,
    user_full_name: String,
    role_at_time_of_approval: Role,
    comment: Option<String>,
    from_status: TaskStatus,
    to_status: TaskStatus,
    created_at: DateTime<Utc>,
}

impl ApprovalRecord {
    /// Returns the decision.
    #[must_use]
    pub const fn decision(&self) -> ApprovalDecision {
        self.decision
    }

    /// Returns the deciding user's identifier.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the deciding user's name as it was at decision time.
    #[must_use]
    pub fn user_full_name(&self) -> &str {
        &self.user_full_name
    }

    /// Returns the role snapshot taken when the decision was recorded.
    #[must_use]
    pub const fn role_at_time_of_approval(&self) -> Role {
        self.role_at_time_of_approval
    }

    /// Returns the comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the status the task left.
    #[must_use]
    pub const fn from_status(&self) -> TaskStatus {
        self.from_status
    }

    /// Returns the status the task entered.
    #[must_use]
    pub const fn to_status(&self) -> TaskStatus {
        self.to_status
    }

    /// Returns when the decision was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A decision about to be recorded.
#[derive(Debug, Clone, Copy)]
pub struct LedgerEntry<'a> {
    /// Decision taken.
    pub decision: ApprovalDecision,
    /// Who took it.
    pub actor: &'a Actor,
    /// Optional comment, already trimmed.
    pub comment: Option<&'a str>,
    /// Status before the transition.
    pub from: TaskStatus,
    /// Status after the transition.
    pub to: TaskStatus,
}

/// Approval history in creation order, oldest first.
///
/// The ledger only grows; there is no API to edit or remove records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalLedger(Vec<ApprovalRecord>);

impl ApprovalLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Reconstructs a ledger from persisted records, kept in the given order.
    #[must_use]
    pub const fn from_records(records: Vec<ApprovalRecord>) -> Self {
        Self(records)
    }

    /// Appends a record, snapshotting the actor's current role, and returns
    /// a copy of it.
    pub fn append(&mut self, entry: LedgerEntry<'_>, clock: &impl Clock) -> ApprovalRecord {
        let record = ApprovalRecord {
            decision: entry.decision,
            user_id: entry.actor.id(),
            user_full_name: entry.actor.full_name().to_owned(),
            role_at_time_of_approval: entry.actor.role(),
            comment: entry.comment.map(str::to_owned),
            from_status: entry.from,
            to_status: entry.to,
            created_at: clock.utc(),
        };
        self.0.push(record.clone());
        record
    }

    /// Returns the records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[ApprovalRecord] {
        &self.0
    }

    /// Returns the most recent record.
    #[must_use]
    pub fn latest(&self) -> Option<&ApprovalRecord> {
        self.0.last()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

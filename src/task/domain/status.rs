//! Task lifecycle status and priority.

use super::{ParsePriorityError, ParseTaskStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deprecated undifferentiated rework value still emitted by older clients.
const LEGACY_REWORK: &str = "REWORK";

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Waiting for predecessor tasks to complete.
    Locked,
    /// Open for work by the assignees.
    Active,
    /// Returned to the assignees after a rejection.
    #[serde(alias = "REWORK")]
    ReworkForeman,
    /// Returned to the foreman after a project manager rejection.
    ReworkPm,
    /// Submitted and awaiting foreman review.
    UnderReviewForeman,
    /// Approved by the foreman and awaiting project manager sign-off.
    UnderReviewPm,
    /// Signed off. Terminal.
    Completed,
}

impl TaskStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 7] = [
        Self::Locked,
        Self::Active,
        Self::ReworkForeman,
        Self::ReworkPm,
        Self::UnderReviewForeman,
        Self::UnderReviewPm,
        Self::Completed,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "LOCKED",
            Self::Active => "ACTIVE",
            Self::ReworkForeman => "REWORK_FOREMAN",
            Self::ReworkPm => "REWORK_PM",
            Self::UnderReviewForeman => "UNDER_REVIEW_FOREMAN",
            Self::UnderReviewPm => "UNDER_REVIEW_PM",
            Self::Completed => "COMPLETED",
        }
    }

    /// Returns `true` when no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` for the statuses a rejection sends work back to.
    #[must_use]
    pub const fn is_rework(self) -> bool {
        matches!(self, Self::ReworkForeman | Self::ReworkPm)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    /// Parses a status, resolving the legacy `REWORK` alias to
    /// [`TaskStatus::ReworkForeman`].
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "LOCKED" => Ok(Self::Locked),
            "ACTIVE" => Ok(Self::Active),
            "REWORK_FOREMAN" | LEGACY_REWORK => Ok(Self::ReworkForeman),
            "REWORK_PM" => Ok(Self::ReworkPm),
            "UNDER_REVIEW_FOREMAN" => Ok(Self::UnderReviewForeman),
            "UNDER_REVIEW_PM" => Ok(Self::UnderReviewPm),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Scheduling priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Must be handled first.
    High,
    /// Normal scheduling.
    Medium,
    /// Can wait.
    Low,
}

impl Priority {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParsePriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(ParsePriorityError(value.to_owned())),
        }
    }
}

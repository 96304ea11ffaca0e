//! Site roles and the acting user supplied with every call.

use super::{ParseRoleError, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user on the construction site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Performs checklist work on site.
    Worker,
    /// Reviews worker output and submits to the project manager.
    Foreman,
    /// Project manager giving final sign-off.
    Pm,
    /// Prices work; holds no review authority.
    Estimator,
    /// Platform administrator; holds no review authority.
    SuperAdmin,
}

impl Role {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "WORKER",
            Self::Foreman => "FOREMAN",
            Self::Pm => "PM",
            Self::Estimator => "ESTIMATOR",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Returns `true` for roles that plan work and may create tasks.
    #[must_use]
    pub const fn can_plan_tasks(self) -> bool {
        matches!(self, Self::Pm | Self::Estimator | Self::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "WORKER" => Ok(Self::Worker),
            "FOREMAN" => Ok(Self::Foreman),
            "PM" => Ok(Self::Pm),
            "ESTIMATOR" => Ok(Self::Estimator),
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}

/// The user performing an operation, as resolved by the identity provider.
///
/// The role is captured per call; ledger entries snapshot it so later role
/// changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    id: UserId,
    full_name: String,
    role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub fn new(id: UserId, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            role,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns the role held at call time.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }
}

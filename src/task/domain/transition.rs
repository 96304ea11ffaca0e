//! The authoritative review transition table.
//!
//! Every role-gated move between statuses is listed once in `RULES`. Both
//! UI-side validation ([`TransitionTable::available_actions`]) and
//! enforcement ([`TransitionTable::resolve`]) read the same rows, so the two
//! cannot drift apart.

use super::{
    ApprovalDecision, Checklist, ParseRejectionTargetError, ParseReviewActionError, PhotoRef,
    PreconditionFailure, Role, TaskStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review action an actor may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Hand work in for review.
    Submit,
    /// Accept the work under review.
    Approve,
    /// Send the work under review back for rework.
    Reject,
}

impl ReviewAction {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Returns the ledger decision recorded for this action.
    #[must_use]
    pub const fn decision(self) -> ApprovalDecision {
        match self {
            Self::Submit => ApprovalDecision::Submitted,
            Self::Approve => ApprovalDecision::Approved,
            Self::Reject => ApprovalDecision::Rejected,
        }
    }

    /// Returns `true` when the action cannot proceed without a comment.
    #[must_use]
    pub const fn requires_comment(self) -> bool {
        matches!(self, Self::Reject)
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReviewAction {
    type Error = ParseReviewActionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submit" => Ok(Self::Submit),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseReviewActionError(value.to_owned())),
        }
    }
}

/// Where a project manager rejection sends the task. Set per deployment
/// through `review.pm_rejection_target`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmRejectionTarget {
    /// Back to the assignees via [`TaskStatus::ReworkForeman`].
    #[default]
    ReworkForeman,
    /// Back to the foreman via [`TaskStatus::ReworkPm`].
    ReworkPm,
}

impl PmRejectionTarget {
    /// Returns the status a PM rejection lands in.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        match self {
            Self::ReworkForeman => TaskStatus::ReworkForeman,
            Self::ReworkPm => TaskStatus::ReworkPm,
        }
    }

    /// Returns the configuration representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReworkForeman => "rework_foreman",
            Self::ReworkPm => "rework_pm",
        }
    }
}

impl std::str::FromStr for PmRejectionTarget {
    type Err = ParseRejectionTargetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rework_foreman" => Ok(Self::ReworkForeman),
            "rework_pm" => Ok(Self::ReworkPm),
            _ => Err(ParseRejectionTargetError(value.to_owned())),
        }
    }
}

/// Tunable review rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPolicy {
    /// Destination of a project manager rejection.
    #[serde(default)]
    pub pm_rejection_target: PmRejectionTarget,
}

/// Evidence a transition demands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Every checklist item effectively complete.
    pub checklist_complete: bool,
    /// Every photo-required item has its photo.
    pub item_photos: bool,
    /// The task has a final photo.
    pub final_photo: bool,
}

impl Requirements {
    const NONE: Self = Self {
        checklist_complete: false,
        item_photos: false,
        final_photo: false,
    };

    /// Checks the demanded evidence against the task state, reporting the
    /// first gap found.
    ///
    /// # Errors
    ///
    /// Returns the unmet [`PreconditionFailure`].
    pub fn verify(
        self,
        checklist: &Checklist,
        final_photo: Option<&PhotoRef>,
    ) -> Result<(), PreconditionFailure> {
        if self.checklist_complete {
            let remaining = checklist.incomplete_count();
            if remaining > 0 {
                return Err(PreconditionFailure::IncompleteChecklist { remaining });
            }
        }
        if self.item_photos {
            let missing = checklist.missing_photo_count();
            if missing > 0 {
                return Err(PreconditionFailure::MissingItemPhotos { missing });
            }
        }
        if self.final_photo && final_photo.is_none() {
            return Err(PreconditionFailure::MissingFinalPhoto);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Fixed(TaskStatus),
    PmRejection,
}

#[derive(Debug, Clone, Copy)]
struct TransitionRule {
    from: TaskStatus,
    action: ReviewAction,
    roles: &'static [Role],
    requires: Requirements,
    worker_photo_exempt: bool,
    target: Target,
}

const SUBMIT_TO_FOREMAN: Requirements = Requirements {
    checklist_complete: true,
    item_photos: false,
    final_photo: true,
};

const FULL_EVIDENCE: Requirements = Requirements {
    checklist_complete: true,
    item_photos: true,
    final_photo: true,
};

const PHOTO_EVIDENCE: Requirements = Requirements {
    checklist_complete: false,
    item_photos: true,
    final_photo: true,
};

const RULES: [TransitionRule; 7] = [
    TransitionRule {
        from: TaskStatus::Active,
        action: ReviewAction::Submit,
        roles: &[Role::Worker, Role::Foreman],
        requires: SUBMIT_TO_FOREMAN,
        worker_photo_exempt: true,
        target: Target::Fixed(TaskStatus::UnderReviewForeman),
    },
    TransitionRule {
        from: TaskStatus::ReworkForeman,
        action: ReviewAction::Submit,
        roles: &[Role::Worker, Role::Foreman],
        requires: SUBMIT_TO_FOREMAN,
        worker_photo_exempt: true,
        target: Target::Fixed(TaskStatus::UnderReviewForeman),
    },
    TransitionRule {
        from: TaskStatus::ReworkPm,
        action: ReviewAction::Submit,
        roles: &[Role::Foreman],
        requires: FULL_EVIDENCE,
        worker_photo_exempt: false,
        target: Target::Fixed(TaskStatus::UnderReviewPm),
    },
    TransitionRule {
        from: TaskStatus::UnderReviewForeman,
        action: ReviewAction::Approve,
        roles: &[Role::Foreman],
        requires: PHOTO_EVIDENCE,
        worker_photo_exempt: false,
        target: Target::Fixed(TaskStatus::UnderReviewPm),
    },
    TransitionRule {
        from: TaskStatus::UnderReviewForeman,
        action: ReviewAction::Reject,
        roles: &[Role::Foreman],
        requires: Requirements::NONE,
        worker_photo_exempt: false,
        target: Target::Fixed(TaskStatus::ReworkForeman),
    },
    TransitionRule {
        from: TaskStatus::UnderReviewPm,
        action: ReviewAction::Approve,
        roles: &[Role::Pm],
        requires: Requirements::NONE,
        worker_photo_exempt: false,
        target: Target::Fixed(TaskStatus::Completed),
    },
    TransitionRule {
        from: TaskStatus::UnderReviewPm,
        action: ReviewAction::Reject,
        roles: &[Role::Pm],
        requires: Requirements::NONE,
        worker_photo_exempt: false,
        target: Target::PmRejection,
    },
];

/// A permitted transition with the evidence it demands from this actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTransition {
    /// Status the task will enter.
    pub to: TaskStatus,
    /// Evidence to verify before applying.
    pub requires: Requirements,
}

/// Capability letting a reviewer annotate checklist items.
///
/// Only [`TransitionTable::remark_grant`] issues grants, and only to the role
/// reviewing the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemarkGrant {
    status: TaskStatus,
    role: Role,
}

impl RemarkGrant {
    /// Returns the status the grant was issued for.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        self.status
    }

    /// Returns the reviewing role.
    #[must_use]
    pub const fn role(self) -> Role {
        self.role
    }
}

/// Transition table bound to a review policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionTable {
    policy: ReviewPolicy,
}

impl TransitionTable {
    /// Creates a table applying `policy`.
    #[must_use]
    pub const fn new(policy: ReviewPolicy) -> Self {
        Self { policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> ReviewPolicy {
        self.policy
    }

    /// Looks up the transition `role` may trigger with `action` from `from`.
    ///
    /// Returns `None` when no row permits it, which callers report as an
    /// unauthorized transition. Terminal statuses never resolve.
    #[must_use]
    pub fn resolve(
        &self,
        from: TaskStatus,
        action: ReviewAction,
        role: Role,
    ) -> Option<ResolvedTransition> {
        RULES
            .iter()
            .find(|rule| rule.from == from && rule.action == action && rule.roles.contains(&role))
            .map(|rule| ResolvedTransition {
                to: self.target_status(rule.target),
                requires: if rule.worker_photo_exempt && role == Role::Worker {
                    Requirements {
                        checklist_complete: rule.requires.checklist_complete,
                        ..Requirements::NONE
                    }
                } else {
                    rule.requires
                },
            })
    }

    /// Lists the actions `role` may request from `status`, in table order.
    #[must_use]
    pub fn available_actions(&self, status: TaskStatus, role: Role) -> Vec<ReviewAction> {
        RULES
            .iter()
            .filter(|rule| rule.from == status && rule.roles.contains(&role))
            .map(|rule| rule.action)
            .collect()
    }

    /// Roles allowed to edit checklist items and the final photo in `status`.
    #[must_use]
    pub const fn editors(status: TaskStatus) -> &'static [Role] {
        match status {
            TaskStatus::Active | TaskStatus::ReworkForeman => &[Role::Worker, Role::Foreman],
            TaskStatus::ReworkPm | TaskStatus::UnderReviewForeman => &[Role::Foreman],
            TaskStatus::UnderReviewPm => &[Role::Pm],
            TaskStatus::Locked | TaskStatus::Completed => &[],
        }
    }

    /// Returns `true` when `role` may edit the task in `status`.
    #[must_use]
    pub fn can_edit(status: TaskStatus, role: Role) -> bool {
        Self::editors(status).contains(&role)
    }

    /// Issues a remark grant when `role` is the reviewer of `status`.
    #[must_use]
    pub fn remark_grant(status: TaskStatus, role: Role) -> Option<RemarkGrant> {
        let reviewing = matches!(
            (status, role),
            (TaskStatus::UnderReviewForeman, Role::Foreman) | (TaskStatus::UnderReviewPm, Role::Pm)
        );
        reviewing.then_some(RemarkGrant { status, role })
    }

    fn target_status(&self, target: Target) -> TaskStatus {
        match target {
            Target::Fixed(status) => status,
            Target::PmRejection => self.policy.pm_rejection_target.status(),
        }
    }
}

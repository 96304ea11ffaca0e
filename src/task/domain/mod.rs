//! Domain model for site task review.
//!
//! Checklist evidence, the role-gated transition table, and the approval
//! ledger live here. Nothing in this module performs I/O; timestamps come
//! from an injected [`mockable::Clock`].

mod approval;
mod checklist;
mod error;
mod ids;
mod role;
mod status;
mod task;
mod transition;

pub use approval::{ApprovalDecision, ApprovalLedger, ApprovalRecord, LedgerEntry};
pub use checklist::{Checklist, ChecklistItem, PersistedChecklistItem, ToggleOutcome};
pub use error::{
    ParsePriorityError, ParseRejectionTargetError, ParseReviewActionError, ParseRoleError,
    ParseTaskStatusError, PreconditionFailure, TaskDomainError,
};
pub use ids::{ChecklistItemId, PhotoRef, TaskId, UserId};
pub use role::{Actor, Role};
pub use status::{Priority, TaskStatus};
pub use task::{NewTaskParams, PersistedTaskData, Submission, Task};
pub use transition::{
    PmRejectionTarget, RemarkGrant, Requirements, ResolvedTransition, ReviewAction, ReviewPolicy,
    TransitionTable,
};

//! Error types for task domain validation and parsing.

use super::{ChecklistItemId, ReviewAction, Role, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned by task domain operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTaskTitle,

    /// A checklist item description is empty after trimming.
    #[error("checklist item description must not be empty")]
    EmptyChecklistDescription,

    /// A checklist position exceeds the order index range.
    #[error("checklist position {0} exceeds the order index range")]
    ChecklistPositionOutOfRange(usize),

    /// A photo reference is empty or malformed.
    #[error("invalid photo reference '{0}'")]
    InvalidPhotoRef(String),

    /// Two checklist items share an identifier.
    #[error("duplicate checklist item identifier: {0}")]
    DuplicateChecklistItem(ChecklistItemId),

    /// The checklist item does not belong to the task.
    #[error("checklist item {item_id} not found on task {task_id}")]
    ChecklistItemNotFound {
        /// Task that was searched.
        task_id: TaskId,
        /// Item that was requested.
        item_id: ChecklistItemId,
    },

    /// The role may not request the action from the current status.
    #[error("{role} may not {action} task {task_id} while it is {status}")]
    UnauthorizedTransition {
        /// Task the action targeted.
        task_id: TaskId,
        /// Status at request time.
        status: TaskStatus,
        /// Requested action.
        action: ReviewAction,
        /// Role of the requesting actor.
        role: Role,
    },

    /// The role may not edit the task in its current status.
    #[error("{role} may not edit task {task_id} while it is {status}")]
    UnauthorizedEdit {
        /// Task the edit targeted.
        task_id: TaskId,
        /// Status at request time.
        status: TaskStatus,
        /// Role of the requesting actor.
        role: Role,
    },

    /// The role holds no reviewer grant for the current status.
    #[error("{role} may not place remarks on task {task_id} while it is {status}")]
    UnauthorizedRemark {
        /// Task the remark targeted.
        task_id: TaskId,
        /// Status at request time.
        status: TaskStatus,
        /// Role of the requesting actor.
        role: Role,
    },

    /// A precondition for the requested operation does not hold.
    #[error("task {task_id}: {failure}")]
    PreconditionNotMet {
        /// Task the operation targeted.
        task_id: TaskId,
        /// The unmet precondition.
        failure: PreconditionFailure,
    },

    /// A rejection was requested without a usable comment.
    #[error("rejecting task {task_id} requires a comment")]
    MissingComment {
        /// Task the rejection targeted.
        task_id: TaskId,
    },
}

/// The specific precondition that blocked an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreconditionFailure {
    /// Checklist items are not effectively complete.
    #[error("{remaining} checklist item(s) are not complete")]
    IncompleteChecklist {
        /// Number of items that are not effectively complete.
        remaining: usize,
    },

    /// Photo-required checklist items lack a photo.
    #[error("{missing} checklist item(s) still require photos")]
    MissingItemPhotos {
        /// Number of photo-required items without a photo.
        missing: usize,
    },

    /// The task has no final photo.
    #[error("a final photo is required")]
    MissingFinalPhoto,

    /// A photo-required item cannot be completed without a photo by this role.
    #[error("checklist item {item_id} requires a photo before it can be completed")]
    PhotoRequired {
        /// Item that needs a photo.
        item_id: ChecklistItemId,
    },

    /// Un-completing an item with a photo needs explicit confirmation.
    #[error("un-completing checklist item {item_id} deletes its photo and must be confirmed")]
    PhotoRemovalUnconfirmed {
        /// Item whose photo would be deleted.
        item_id: ChecklistItemId,
    },

    /// The task is locked behind predecessors that have not completed.
    #[error("{pending} predecessor task(s) are not completed")]
    PredecessorsIncomplete {
        /// Number of predecessors not yet completed.
        pending: usize,
    },

    /// Only locked tasks can be unlocked.
    #[error("task is {0}, not LOCKED")]
    NotLocked(TaskStatus),
}

/// Error returned while parsing task statuses from the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing roles from the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

/// Error returned while parsing priorities from the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);

/// Error returned while parsing review actions from the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown review action: {0}")]
pub struct ParseReviewActionError(pub String);

/// Error returned while parsing a PM rejection target from configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown PM rejection target: {0} (expected rework_foreman|rework_pm)")]
pub struct ParseRejectionTargetError(pub String);

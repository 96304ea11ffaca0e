//! Request payloads accepted by [`super::ReviewService`].

use crate::task::domain::{
    ChecklistItem, ChecklistItemId, Priority, ReviewAction, TaskDomainError, TaskId, UserId,
};
use chrono::{DateTime, Utc};

/// Checklist line to create alongside a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChecklistItem {
    description: String,
    methodology: Option<String>,
    photo_required: bool,
}

impl NewChecklistItem {
    /// Creates an item that needs no photo.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            methodology: None,
            photo_required: false,
        }
    }

    /// Sets the working method.
    #[must_use]
    pub fn with_methodology(mut self, methodology: impl Into<String>) -> Self {
        self.methodology = Some(methodology.into());
        self
    }

    /// Requires photo evidence for the item.
    #[must_use]
    pub const fn photo_required(mut self) -> Self {
        self.photo_required = true;
        self
    }

    pub(super) fn into_domain(self, position: usize) -> Result<ChecklistItem, TaskDomainError> {
        let mut item = ChecklistItem::at_position(position, self.description)?;
        if let Some(methodology) = self.methodology {
            item = item.with_methodology(methodology);
        }
        if self.photo_required {
            item = item.photo_required();
        }
        Ok(item)
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub(super) title: String,
    pub(super) priority: Priority,
    pub(super) deadline: DateTime<Utc>,
    pub(super) assignees: Vec<UserId>,
    pub(super) checklist: Vec<NewChecklistItem>,
    pub(super) depends_on: Vec<TaskId>,
}

impl CreateTaskRequest {
    /// Creates a request with required task fields.
    #[must_use]
    pub fn new(title: impl Into<String>, priority: Priority, deadline: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            priority,
            deadline,
            assignees: Vec::new(),
            checklist: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Sets the assigned users.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = UserId>) -> Self {
        self.assignees = assignees.into_iter().collect();
        self
    }

    /// Appends a checklist item; items keep the order they are added in.
    #[must_use]
    pub fn with_checklist_item(mut self, item: NewChecklistItem) -> Self {
        self.checklist.push(item);
        self
    }

    /// Sets predecessor tasks. The task starts locked when any are given.
    #[must_use]
    pub fn with_predecessors(mut self, depends_on: impl IntoIterator<Item = TaskId>) -> Self {
        self.depends_on = depends_on.into_iter().collect();
        self
    }
}

/// Request payload for toggling checklist item completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleChecklistItemRequest {
    pub(super) task_id: TaskId,
    pub(super) item_id: ChecklistItemId,
    pub(super) completed: bool,
    pub(super) confirm_photo_removal: bool,
}

impl ToggleChecklistItemRequest {
    /// Creates a request setting the item's completion to `completed`.
    #[must_use]
    pub const fn new(task_id: TaskId, item_id: ChecklistItemId, completed: bool) -> Self {
        Self {
            task_id,
            item_id,
            completed,
            confirm_photo_removal: false,
        }
    }

    /// Confirms that un-completing may delete the item's photo.
    #[must_use]
    pub const fn confirm_photo_removal(mut self) -> Self {
        self.confirm_photo_removal = true;
        self
    }
}

/// Request payload for a review transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub(super) task_id: TaskId,
    pub(super) action: ReviewAction,
    pub(super) comment: Option<String>,
}

impl TransitionRequest {
    /// Creates a request without a comment.
    #[must_use]
    pub const fn new(task_id: TaskId, action: ReviewAction) -> Self {
        Self {
            task_id,
            action,
            comment: None,
        }
    }

    /// Sets the comment. Rejections require one.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

//! Task aggregate root.

use super::{
    Actor, ApprovalLedger, ApprovalRecord, Checklist, ChecklistItem, ChecklistItemId,
    LedgerEntry, PhotoRef, PreconditionFailure, Priority, RemarkGrant, ReviewAction, Role,
    TaskDomainError, TaskId, TaskStatus, ToggleOutcome, TransitionTable, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What was handed in with the latest submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    author_name: String,
    comment: Option<String>,
    photos: Vec<PhotoRef>,
    submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Returns the submitting user's name.
    #[must_use]
    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    /// Returns the submission comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns item photos followed by the final photo, as present at
    /// submission time.
    #[must_use]
    pub fn photos(&self) -> &[PhotoRef] {
        &self.photos
    }

    /// Returns when the work was submitted.
    #[must_use]
    pub const fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskParams {
    /// Task title.
    pub title: String,
    /// Scheduling priority.
    pub priority: Priority,
    /// Due date.
    pub deadline: DateTime<Utc>,
    /// Assigned users; duplicates collapse.
    pub assignees: Vec<UserId>,
    /// Checklist items; ordered by `order_index` on construction.
    pub checklist: Vec<ChecklistItem>,
    /// Tasks that must complete before this one unlocks.
    pub depends_on: Vec<TaskId>,
    /// How many of `depends_on` have not completed yet.
    pub pending_predecessors: usize,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    status: TaskStatus,
    priority: Priority,
    deadline: DateTime<Utc>,
    assignees: BTreeSet<UserId>,
    checklist: Checklist,
    final_photo: Option<PhotoRef>,
    submission: Option<Submission>,
    rejection_reason: Option<String>,
    rejected_by_full_name: Option<String>,
    foreman_note: Option<String>,
    approvals: ApprovalLedger,
    depends_on: Vec<TaskId>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted deadline.
    pub deadline: DateTime<Utc>,
    /// Persisted assignees.
    pub assignees: BTreeSet<UserId>,
    /// Persisted checklist.
    pub checklist: Checklist,
    /// Persisted final photo, if any.
    pub final_photo: Option<PhotoRef>,
    /// Persisted latest submission, if any.
    pub submission: Option<Submission>,
    /// Persisted rejection reason, if any.
    pub rejection_reason: Option<String>,
    /// Persisted name of the latest rejecting reviewer, if any.
    pub rejected_by_full_name: Option<String>,
    /// Persisted foreman note, if any.
    pub foreman_note: Option<String>,
    /// Persisted approval history.
    pub approvals: ApprovalLedger,
    /// Persisted predecessors.
    pub depends_on: Vec<TaskId>,
    /// Persisted concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Version assigned to a task that has never been saved over.
    pub const INITIAL_VERSION: u64 = 1;

    /// Creates a task. It starts [`TaskStatus::Locked`] while any
    /// predecessor is pending and [`TaskStatus::Active`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskTitle`] for a blank title or
    /// [`TaskDomainError::DuplicateChecklistItem`] when item identifiers
    /// collide.
    pub fn new(params: NewTaskParams, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let title = params.title.trim().to_owned();
        if title.is_empty() {
            return Err(TaskDomainError::EmptyTaskTitle);
        }
        let checklist = Checklist::new(params.checklist)?;

        let mut depends_on = params.depends_on;
        depends_on.sort_unstable();
        depends_on.dedup();
        let status = if depends_on.is_empty() || params.pending_predecessors == 0 {
            TaskStatus::Active
        } else {
            TaskStatus::Locked
        };

        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            title,
            status,
            priority: params.priority,
            deadline: params.deadline,
            assignees: params.assignees.into_iter().collect(),
            checklist,
            final_photo: None,
            submission: None,
            rejection_reason: None,
            rejected_by_full_name: None,
            foreman_note: None,
            approvals: ApprovalLedger::new(),
            depends_on,
            version: Self::INITIAL_VERSION,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            status: data.status,
            priority: data.priority,
            deadline: data.deadline,
            assignees: data.assignees,
            checklist: data.checklist,
            final_photo: data.final_photo,
            submission: data.submission,
            rejection_reason: data.rejection_reason,
            rejected_by_full_name: data.rejected_by_full_name,
            foreman_note: data.foreman_note,
            approvals: data.approvals,
            depends_on: data.depends_on,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the assigned users.
    #[must_use]
    pub const fn assignees(&self) -> &BTreeSet<UserId> {
        &self.assignees
    }

    /// Returns the checklist in display order.
    #[must_use]
    pub const fn checklist(&self) -> &Checklist {
        &self.checklist
    }

    /// Returns the final photo, if any.
    #[must_use]
    pub const fn final_photo(&self) -> Option<&PhotoRef> {
        self.final_photo.as_ref()
    }

    /// Returns the latest submission, if any.
    #[must_use]
    pub const fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    /// Returns the reason given by the latest rejection still in effect.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Returns the name of the reviewer behind the latest rejection.
    #[must_use]
    pub fn rejected_by_full_name(&self) -> Option<&str> {
        self.rejected_by_full_name.as_deref()
    }

    /// Returns the foreman's latest note to the project manager.
    #[must_use]
    pub fn foreman_note(&self) -> Option<&str> {
        self.foreman_note.as_deref()
    }

    /// Returns the approval history.
    #[must_use]
    pub const fn approvals(&self) -> &ApprovalLedger {
        &self.approvals
    }

    /// Returns the predecessor tasks.
    #[must_use]
    pub fn depends_on(&self) -> &[TaskId] {
        &self.depends_on
    }

    /// Returns the concurrency version of the stored copy this task was
    /// loaded from.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Lists the review actions `actor` may request right now.
    #[must_use]
    pub fn available_actions(&self, actor: &Actor, table: &TransitionTable) -> Vec<ReviewAction> {
        table.available_actions(self.status, actor.role())
    }

    /// Toggles completion of a checklist item.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedEdit`] when the actor cannot
    /// edit the task in its status, [`TaskDomainError::ChecklistItemNotFound`]
    /// for an unknown item, or [`TaskDomainError::PreconditionNotMet`] when the
    /// item's photo rules block the toggle.
    pub fn toggle_checklist_item(
        &mut self,
        item_id: ChecklistItemId,
        requested: bool,
        confirm_photo_removal: bool,
        actor: &Actor,
        clock: &impl Clock,
    ) -> Result<ToggleOutcome, TaskDomainError> {
        self.ensure_editable_by(actor)?;
        let task_id = self.id;
        let outcome = self
            .item_mut(item_id)?
            .toggle_complete(requested, actor.role(), confirm_photo_removal)
            .map_err(|failure| TaskDomainError::PreconditionNotMet { task_id, failure })?;
        self.touch(clock);
        Ok(outcome)
    }

    /// Attaches a photo to a checklist item, completing it.
    ///
    /// Returns the photo it replaced, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedEdit`] or
    /// [`TaskDomainError::ChecklistItemNotFound`].
    pub fn attach_checklist_photo(
        &mut self,
        item_id: ChecklistItemId,
        photo: PhotoRef,
        actor: &Actor,
        clock: &impl Clock,
    ) -> Result<Option<PhotoRef>, TaskDomainError> {
        self.ensure_editable_by(actor)?;
        let replaced = self.item_mut(item_id)?.attach_photo(photo);
        self.touch(clock);
        Ok(replaced)
    }

    /// Detaches the photo of a checklist item.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedEdit`] or
    /// [`TaskDomainError::ChecklistItemNotFound`].
    pub fn clear_checklist_photo(
        &mut self,
        item_id: ChecklistItemId,
        actor: &Actor,
        clock: &impl Clock,
    ) -> Result<Option<PhotoRef>, TaskDomainError> {
        self.ensure_editable_by(actor)?;
        let removed = self.item_mut(item_id)?.clear_photo();
        self.touch(clock);
        Ok(removed)
    }

    /// Sets or clears a reviewer remark on a checklist item.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedRemark`] when the grant was
    /// issued for another status, or
    /// [`TaskDomainError::ChecklistItemNotFound`].
    pub fn set_checklist_remark(
        &mut self,
        item_id: ChecklistItemId,
        remark: Option<String>,
        grant: RemarkGrant,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if grant.status() != self.status {
            return Err(TaskDomainError::UnauthorizedRemark {
                task_id: self.id,
                status: self.status,
                role: grant.role(),
            });
        }
        self.item_mut(item_id)?.set_remark(remark, &grant);
        self.touch(clock);
        Ok(())
    }

    /// Sets the final photo, returning the one it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedEdit`].
    pub fn set_final_photo(
        &mut self,
        photo: PhotoRef,
        actor: &Actor,
        clock: &impl Clock,
    ) -> Result<Option<PhotoRef>, TaskDomainError> {
        self.ensure_editable_by(actor)?;
        let replaced = self.final_photo.replace(photo);
        self.touch(clock);
        Ok(replaced)
    }

    /// Removes the final photo, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedEdit`].
    pub fn clear_final_photo(
        &mut self,
        actor: &Actor,
        clock: &impl Clock,
    ) -> Result<Option<PhotoRef>, TaskDomainError> {
        self.ensure_editable_by(actor)?;
        let removed = self.final_photo.take();
        self.touch(clock);
        Ok(removed)
    }

    /// Applies a review action and records it in the ledger.
    ///
    /// All checks run before anything changes, so a failed call leaves the
    /// task untouched. Check order: terminal status, rejection comment, role
    /// authority, evidence.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedTransition`],
    /// [`TaskDomainError::MissingComment`] or
    /// [`TaskDomainError::PreconditionNotMet`].
    pub fn apply_review(
        &mut self,
        action: ReviewAction,
        actor: &Actor,
        comment: Option<&str>,
        table: &TransitionTable,
        clock: &impl Clock,
    ) -> Result<ApprovalRecord, TaskDomainError> {
        let task_id = self.id;
        let from = self.status;
        let unauthorized = || TaskDomainError::UnauthorizedTransition {
            task_id,
            status: from,
            action,
            role: actor.role(),
        };
        if from.is_terminal() {
            return Err(unauthorized());
        }

        let note = comment.map(str::trim).filter(|text| !text.is_empty());
        if action.requires_comment() && note.is_none() {
            return Err(TaskDomainError::MissingComment { task_id });
        }

        let transition = table
            .resolve(from, action, actor.role())
            .ok_or_else(unauthorized)?;
        transition
            .requires
            .verify(&self.checklist, self.final_photo.as_ref())
            .map_err(|failure| TaskDomainError::PreconditionNotMet { task_id, failure })?;

        match action {
            ReviewAction::Submit => {
                self.submission = Some(Submission {
                    author_name: actor.full_name().to_owned(),
                    comment: note.map(str::to_owned),
                    photos: self
                        .checklist
                        .photos()
                        .chain(self.final_photo.as_ref())
                        .cloned()
                        .collect(),
                    submitted_at: clock.utc(),
                });
                self.clear_rejection();
                self.record_foreman_note(actor, note);
            }
            ReviewAction::Approve => {
                self.clear_rejection();
                self.record_foreman_note(actor, note);
            }
            ReviewAction::Reject => {
                self.rejection_reason = note.map(str::to_owned);
                self.rejected_by_full_name = Some(actor.full_name().to_owned());
                self.foreman_note = None;
            }
        }

        self.status = transition.to;
        let record = self.approvals.append(
            LedgerEntry {
                decision: action.decision(),
                actor,
                comment: note,
                from,
                to: transition.to,
            },
            clock,
        );
        self.touch(clock);
        Ok(record)
    }

    /// Moves a locked task to [`TaskStatus::Active`] once every predecessor
    /// has completed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::PreconditionNotMet`] when the task is not
    /// locked or `pending_predecessors` is non-zero.
    pub fn unlock(
        &mut self,
        pending_predecessors: usize,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let failure = if self.status != TaskStatus::Locked {
            Some(PreconditionFailure::NotLocked(self.status))
        } else if pending_predecessors > 0 {
            Some(PreconditionFailure::PredecessorsIncomplete {
                pending: pending_predecessors,
            })
        } else {
            None
        };
        if let Some(failure) = failure {
            return Err(TaskDomainError::PreconditionNotMet {
                task_id: self.id,
                failure,
            });
        }
        self.status = TaskStatus::Active;
        self.touch(clock);
        Ok(())
    }

    /// Records the version assigned by the repository after a save.
    pub(crate) const fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Checks that `actor` may edit the checklist and final photo in the
    /// current status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedEdit`].
    pub fn ensure_editable_by(&self, actor: &Actor) -> Result<(), TaskDomainError> {
        if TransitionTable::can_edit(self.status, actor.role()) {
            return Ok(());
        }
        Err(TaskDomainError::UnauthorizedEdit {
            task_id: self.id,
            status: self.status,
            role: actor.role(),
        })
    }

    fn item_mut(
        &mut self,
        item_id: ChecklistItemId,
    ) -> Result<&mut ChecklistItem, TaskDomainError> {
        let task_id = self.id;
        self.checklist
            .get_mut(item_id)
            .ok_or(TaskDomainError::ChecklistItemNotFound { task_id, item_id })
    }

    fn clear_rejection(&mut self) {
        self.rejection_reason = None;
        self.rejected_by_full_name = None;
    }

    fn record_foreman_note(&mut self, actor: &Actor, comment: Option<&str>) {
        if actor.role() == Role::Foreman {
            self.foreman_note = comment.map(str::to_owned);
        }
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

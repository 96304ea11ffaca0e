//! Review orchestration: the entry point for UI and API handlers.
//!
//! Every mutating call loads the task, applies a synchronous domain mutation,
//! and saves with the loaded version as the expected version. A failed call
//! leaves the stored task untouched. A photo blob is deleted only once the
//! saved task no longer references it, and a blob uploaded for a failed call
//! is deleted again.

use super::{
    CreateTaskRequest, ReviewError, ReviewResult, ToggleChecklistItemRequest, TransitionRequest,
};
use crate::task::{
    domain::{
        Actor, ApprovalRecord, ChecklistItemId, NewTaskParams, PhotoRef, ReviewAction,
        ReviewPolicy, Task, TaskDomainError, TaskId, TaskStatus, TransitionTable,
    },
    ports::{PhotoStore, PhotoUpload, TaskRepository},
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a checklist completion toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistToggle {
    /// The task as saved.
    pub task: Task,
    /// A worker completed a photo-required item without its photo.
    pub needs_photo_follow_up: bool,
}

/// Task review orchestration service.
#[derive(Clone)]
pub struct ReviewService<R, P, C>
where
    R: TaskRepository,
    P: PhotoStore,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    photos: Arc<P>,
    clock: Arc<C>,
    table: TransitionTable,
}

impl<R, P, C> ReviewService<R, P, C>
where
    R: TaskRepository,
    P: PhotoStore,
    C: Clock + Send + Sync,
{
    /// Creates a review service with the default policy.
    #[must_use]
    pub fn new(repository: Arc<R>, photos: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            repository,
            photos,
            clock,
            table: TransitionTable::default(),
        }
    }

    /// Replaces the review policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ReviewPolicy) -> Self {
        self.table = TransitionTable::new(policy);
        self
    }

    /// Returns the transition table in force.
    #[must_use]
    pub const fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::CreateForbidden`] for roles that do not plan
    /// work, [`ReviewError::UnknownPredecessor`] for a missing predecessor,
    /// or domain and repository errors.
    pub async fn create_task(
        &self,
        actor: &Actor,
        request: CreateTaskRequest,
    ) -> ReviewResult<Task> {
        if !actor.role().can_plan_tasks() {
            return Err(ReviewError::CreateForbidden { role: actor.role() });
        }
        let predecessors: BTreeSet<TaskId> = request.depends_on.iter().copied().collect();
        let mut pending_predecessors = 0_usize;
        for predecessor in predecessors {
            let found = self
                .repository
                .find_by_id(predecessor)
                .await?
                .ok_or(ReviewError::UnknownPredecessor(predecessor))?;
            if found.status() != TaskStatus::Completed {
                pending_predecessors = pending_predecessors.saturating_add(1);
            }
        }

        let checklist = request
            .checklist
            .into_iter()
            .enumerate()
            .map(|(position, item)| item.into_domain(position))
            .collect::<Result<Vec<_>, TaskDomainError>>()?;
        let task = Task::new(
            NewTaskParams {
                title: request.title,
                priority: request.priority,
                deadline: request.deadline,
                assignees: request.assignees,
                checklist,
                depends_on: request.depends_on,
                pending_predecessors,
            },
            &*self.clock,
        )?;
        self.repository.store(&task).await?;

        info!(
            event_name = "task.created",
            task_id = %task.id(),
            status = %task.status(),
            actor_id = %actor.id(),
            checklist_items = task.checklist().len(),
            "task created"
        );
        Ok(task)
    }

    /// Retrieves a task.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::NotFound`] or repository errors.
    pub async fn get_task(&self, actor: &Actor, task_id: TaskId) -> ReviewResult<Task> {
        debug!(
            event_name = "task.read",
            task_id = %task_id,
            actor_id = %actor.id(),
            "task requested"
        );
        self.load(task_id).await
    }

    /// Returns the approval history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::NotFound`] or repository errors.
    pub async fn list_approval_history(
        &self,
        actor: &Actor,
        task_id: TaskId,
    ) -> ReviewResult<Vec<ApprovalRecord>> {
        let task = self.get_task(actor, task_id).await?;
        Ok(task.approvals().records().to_vec())
    }

    /// Lists the review actions `actor` may request on the task right now.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::NotFound`] or repository errors.
    pub async fn available_actions(
        &self,
        actor: &Actor,
        task_id: TaskId,
    ) -> ReviewResult<Vec<ReviewAction>> {
        let task = self.get_task(actor, task_id).await?;
        Ok(task.available_actions(actor, &self.table))
    }

    /// Sets a checklist item's completion. A photo detached by un-completing
    /// is deleted from the photo store once the task is saved.
    ///
    /// # Errors
    ///
    /// Returns domain errors for authority or photo rules, or repository
    /// errors.
    pub async fn toggle_checklist_item(
        &self,
        actor: &Actor,
        request: ToggleChecklistItemRequest,
    ) -> ReviewResult<ChecklistToggle> {
        let mut task = self.load(request.task_id).await?;
        let outcome = task.toggle_checklist_item(
            request.item_id,
            request.completed,
            request.confirm_photo_removal,
            actor,
            &*self.clock,
        )?;
        let saved = self.persist(&task).await?;
        if let Some(photo) = outcome.removed_photo {
            self.discard_photo(saved.id(), &photo).await;
        }

        info!(
            event_name = "task.checklist.toggled",
            task_id = %saved.id(),
            item_id = %request.item_id,
            completed = request.completed,
            needs_photo_follow_up = outcome.needs_photo_follow_up,
            actor_id = %actor.id(),
            "checklist item toggled"
        );
        Ok(ChecklistToggle {
            task: saved,
            needs_photo_follow_up: outcome.needs_photo_follow_up,
        })
    }

    /// Uploads a photo and attaches it to a checklist item, completing the
    /// item.
    ///
    /// # Errors
    ///
    /// Returns domain errors when the actor may not edit the task or the item
    /// is unknown, photo store errors when the upload fails, or repository
    /// errors.
    pub async fn attach_checklist_photo(
        &self,
        actor: &Actor,
        task_id: TaskId,
        item_id: ChecklistItemId,
        upload: PhotoUpload,
    ) -> ReviewResult<Task> {
        let task = self.load(task_id).await?;
        task.ensure_editable_by(actor)?;
        if task.checklist().get(item_id).is_none() {
            return Err(TaskDomainError::ChecklistItemNotFound { task_id, item_id }.into());
        }

        let photo = self.store_upload(upload).await?;
        let clock = &*self.clock;
        let saved = self
            .commit_photo(task, photo, |target, stored| {
                target.attach_checklist_photo(item_id, stored, actor, clock)
            })
            .await?;

        info!(
            event_name = "task.checklist.photo_attached",
            task_id = %task_id,
            item_id = %item_id,
            actor_id = %actor.id(),
            "checklist photo attached"
        );
        Ok(saved)
    }

    /// Detaches a checklist item's photo and deletes it from the store.
    ///
    /// # Errors
    ///
    /// Returns domain or repository errors.
    pub async fn clear_checklist_photo(
        &self,
        actor: &Actor,
        task_id: TaskId,
        item_id: ChecklistItemId,
    ) -> ReviewResult<Task> {
        let mut task = self.load(task_id).await?;
        let removed = task.clear_checklist_photo(item_id, actor, &*self.clock)?;
        let saved = self.persist(&task).await?;
        if let Some(photo) = removed {
            self.discard_photo(task_id, &photo).await;
        }

        info!(
            event_name = "task.checklist.photo_cleared",
            task_id = %task_id,
            item_id = %item_id,
            actor_id = %actor.id(),
            "checklist photo cleared"
        );
        Ok(saved)
    }

    /// Sets or clears a reviewer remark on a checklist item.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::UnauthorizedRemark`] unless the actor is
    /// reviewing the task's current stage, or domain and repository errors.
    pub async fn set_checklist_remark(
        &self,
        actor: &Actor,
        task_id: TaskId,
        item_id: ChecklistItemId,
        remark: Option<String>,
    ) -> ReviewResult<Task> {
        let mut task = self.load(task_id).await?;
        let grant = TransitionTable::remark_grant(task.status(), actor.role()).ok_or(
            TaskDomainError::UnauthorizedRemark {
                task_id,
                status: task.status(),
                role: actor.role(),
            },
        )?;
        task.set_checklist_remark(item_id, remark, grant, &*self.clock)?;
        let saved = self.persist(&task).await?;

        info!(
            event_name = "task.checklist.remark_set",
            task_id = %task_id,
            item_id = %item_id,
            has_remark = saved
                .checklist()
                .get(item_id)
                .is_some_and(|item| item.remark().is_some()),
            actor_id = %actor.id(),
            "checklist remark updated"
        );
        Ok(saved)
    }

    /// Uploads and sets the task's final photo, deleting the one it
    /// replaces.
    ///
    /// # Errors
    ///
    /// Returns domain, photo store or repository errors.
    pub async fn set_final_photo(
        &self,
        actor: &Actor,
        task_id: TaskId,
        upload: PhotoUpload,
    ) -> ReviewResult<Task> {
        let task = self.load(task_id).await?;
        task.ensure_editable_by(actor)?;

        let photo = self.store_upload(upload).await?;
        let clock = &*self.clock;
        let saved = self
            .commit_photo(task, photo, |target, stored| {
                target.set_final_photo(stored, actor, clock)
            })
            .await?;

        info!(
            event_name = "task.final_photo.set",
            task_id = %task_id,
            actor_id = %actor.id(),
            "final photo set"
        );
        Ok(saved)
    }

    /// Removes the task's final photo and deletes it from the store.
    ///
    /// # Errors
    ///
    /// Returns domain or repository errors.
    pub async fn clear_final_photo(&self, actor: &Actor, task_id: TaskId) -> ReviewResult<Task> {
        let mut task = self.load(task_id).await?;
        let removed = task.clear_final_photo(actor, &*self.clock)?;
        let saved = self.persist(&task).await?;
        if let Some(photo) = removed {
            self.discard_photo(task_id, &photo).await;
        }

        info!(
            event_name = "task.final_photo.cleared",
            task_id = %task_id,
            actor_id = %actor.id(),
            "final photo cleared"
        );
        Ok(saved)
    }

    /// Applies a review action: validates authority, comment and evidence,
    /// moves the task, records the decision and saves.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::NotFound`], domain errors for refused
    /// transitions, or [`crate::task::ports::TaskRepositoryError::ConcurrentModification`]
    /// when another reviewer saved first.
    pub async fn request_transition(
        &self,
        actor: &Actor,
        request: TransitionRequest,
    ) -> ReviewResult<Task> {
        let TransitionRequest {
            task_id,
            action,
            comment,
        } = request;
        let mut task = self.load(task_id).await?;
        let from = task.status();

        let record = task
            .apply_review(action, actor, comment.as_deref(), &self.table, &*self.clock)
            .inspect_err(|err| {
                warn!(
                    event_name = "task.transition.refused",
                    task_id = %task_id,
                    status = %from,
                    action = %action,
                    role = %actor.role(),
                    error = %err,
                    "review transition refused"
                );
            })?;
        let saved = self.persist(&task).await.inspect_err(|err| {
            warn!(
                event_name = "task.transition.save_failed",
                task_id = %task_id,
                action = %action,
                error = %err,
                "review transition not saved"
            );
        })?;

        info!(
            event_name = "task.transition.applied",
            task_id = %task_id,
            from = %record.from_status(),
            to = %record.to_status(),
            decision = %record.decision(),
            actor_id = %actor.id(),
            role = %record.role_at_time_of_approval(),
            version = saved.version(),
            "review transition applied"
        );
        Ok(saved)
    }

    /// Unlocks a locked task whose predecessors have all completed. Only the
    /// scheduler calls this.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::PreconditionNotMet`] when the task is not
    /// locked or predecessors are pending, or repository errors.
    pub async fn unlock_task(&self, task_id: TaskId) -> ReviewResult<Task> {
        let task = self.load(task_id).await?;
        let pending = self.pending_predecessors(&task).await?;
        self.unlock_loaded(task, pending).await
    }

    /// Unlocks every locked dependent of `task_id` whose predecessors have
    /// all completed, returning the unlocked tasks.
    ///
    /// Dependents still waiting on other predecessors are left locked. A
    /// dependent that cannot be checked or saved is logged and skipped so the
    /// rest are still released; calling again retries only the tasks that are
    /// still locked.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the dependents cannot be listed.
    pub async fn release_dependents(&self, task_id: TaskId) -> ReviewResult<Vec<Task>> {
        let mut released = Vec::new();
        for dependent in self.repository.find_dependents(task_id).await? {
            if dependent.status() != TaskStatus::Locked {
                continue;
            }
            let dependent_id = dependent.id();
            match self.release_dependent(task_id, dependent).await {
                Ok(Some(unlocked)) => released.push(unlocked),
                Ok(None) => {}
                Err(err) => warn!(
                    event_name = "task.unlock.failed",
                    task_id = %dependent_id,
                    predecessor_id = %task_id,
                    error = %err,
                    "dependent not released"
                ),
            }
        }
        Ok(released)
    }

    async fn release_dependent(
        &self,
        predecessor_id: TaskId,
        dependent: Task,
    ) -> ReviewResult<Option<Task>> {
        let pending = self.pending_predecessors(&dependent).await?;
        if pending > 0 {
            debug!(
                event_name = "task.unlock.deferred",
                task_id = %dependent.id(),
                predecessor_id = %predecessor_id,
                pending,
                "dependent still waiting on predecessors"
            );
            return Ok(None);
        }
        self.unlock_loaded(dependent, 0).await.map(Some)
    }

    async fn unlock_loaded(&self, mut task: Task, pending: usize) -> ReviewResult<Task> {
        task.unlock(pending, &*self.clock)?;
        let saved = self.persist(&task).await?;

        info!(
            event_name = "task.unlocked",
            task_id = %saved.id(),
            version = saved.version(),
            "task unlocked"
        );
        Ok(saved)
    }

    /// Counts predecessors that are not completed; missing ones count too.
    async fn pending_predecessors(&self, task: &Task) -> ReviewResult<usize> {
        let mut pending = 0_usize;
        for predecessor in task.depends_on() {
            let completed = self
                .repository
                .find_by_id(*predecessor)
                .await?
                .is_some_and(|found| found.status() == TaskStatus::Completed);
            if !completed {
                pending = pending.saturating_add(1);
            }
        }
        Ok(pending)
    }

    async fn load(&self, task_id: TaskId) -> ReviewResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(ReviewError::NotFound(task_id))
    }

    async fn persist(&self, task: &Task) -> ReviewResult<Task> {
        Ok(self.repository.save(task, task.version()).await?)
    }

    /// Applies a mutation that takes ownership of a freshly stored photo and
    /// saves. The new photo is deleted when the mutation or save fails; the
    /// photo it replaced is deleted after a successful save.
    async fn commit_photo<F>(&self, mut task: Task, photo: PhotoRef, apply: F) -> ReviewResult<Task>
    where
        F: FnOnce(&mut Task, PhotoRef) -> Result<Option<PhotoRef>, TaskDomainError> + Send,
    {
        let task_id = task.id();
        let committed = match apply(&mut task, photo.clone()) {
            Ok(replaced) => self.persist(&task).await.map(|saved| (saved, replaced)),
            Err(err) => Err(err.into()),
        };
        match committed {
            Ok((saved, replaced)) => {
                if let Some(previous) = replaced {
                    self.discard_photo(task_id, &previous).await;
                }
                Ok(saved)
            }
            Err(err) => {
                self.discard_photo(task_id, &photo).await;
                Err(err)
            }
        }
    }

    async fn store_upload(&self, upload: PhotoUpload) -> ReviewResult<PhotoRef> {
        debug!(
            event_name = "task.photo.uploading",
            task_id = %upload.task_id(),
            file_name = upload.file_name(),
            content_type = upload.content_type(),
            bytes = upload.bytes().len(),
            "storing photo upload"
        );
        Ok(self.photos.store(upload).await?)
    }

    async fn discard_photo(&self, task_id: TaskId, photo: &PhotoRef) {
        if let Err(err) = self.photos.delete(photo).await {
            warn!(
                event_name = "task.photo.cleanup_failed",
                task_id = %task_id,
                photo = %photo,
                error = %err,
                "failed to delete photo blob"
            );
        }
    }
}

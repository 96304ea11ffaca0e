//! Shared test helpers for in-memory review integration tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use siteflow::task::{
    adapters::memory::{InMemoryPhotoStore, InMemoryTaskRepository},
    domain::{Actor, ChecklistItem, ChecklistItemId, Priority, ReviewAction, Role, Task, TaskId, UserId},
    ports::PhotoUpload,
    services::{
        CreateTaskRequest, NewChecklistItem, ReviewError, ReviewService,
        ToggleChecklistItemRequest, TransitionRequest,
    },
};

/// Service type wired to in-memory adapters.
pub type TestService = ReviewService<InMemoryTaskRepository, InMemoryPhotoStore, DefaultClock>;

/// Description of the photo-required checklist line on planned tasks.
pub const TILING: &str = "Lay wall tiles";

/// Description of the plain checklist line on planned tasks.
pub const GROUTING: &str = "Grout and clean joints";

/// A review service together with its adapters.
pub struct Site {
    pub service: Arc<TestService>,
    pub photos: Arc<InMemoryPhotoStore>,
}

/// Provides a fresh site for each test.
#[fixture]
pub fn site() -> Site {
    let photos = Arc::new(InMemoryPhotoStore::new());
    let service = ReviewService::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::clone(&photos),
        Arc::new(DefaultClock),
    );
    Site {
        service: Arc::new(service),
        photos,
    }
}

/// Builds an actor holding `role`.
#[must_use]
pub fn member(role: Role) -> Actor {
    Actor::new(UserId::new(), format!("{role} on site"), role)
}

/// Builds a small JPEG-like upload for `task_id`.
#[must_use]
pub fn jpeg(task_id: TaskId) -> PhotoUpload {
    PhotoUpload::new(task_id, "progress.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xDB])
}

/// Finds a checklist line by description.
///
/// # Errors
///
/// Returns an error when no line carries `description`.
pub fn item_id(task: &Task, description: &str) -> Result<ChecklistItemId, eyre::Report> {
    task.checklist()
        .iter()
        .find(|line| line.description() == description)
        .map(ChecklistItem::id)
        .ok_or_else(|| eyre::eyre!("no checklist line named {description}"))
}

impl Site {
    /// Plans a bathroom tiling task as a PM.
    ///
    /// # Errors
    ///
    /// Returns an error when creation fails.
    pub async fn plan_task(
        &self,
        title: &str,
        predecessors: &[TaskId],
    ) -> Result<Task, eyre::Report> {
        let request = CreateTaskRequest::new(title, Priority::High, Utc::now() + Duration::days(7))
            .with_assignees([UserId::new()])
            .with_checklist_item(NewChecklistItem::new(TILING).photo_required())
            .with_checklist_item(NewChecklistItem::new(GROUTING))
            .with_predecessors(predecessors.iter().copied());
        Ok(self
            .service
            .create_task(&member(Role::Pm), request)
            .await?)
    }

    /// Completes every checklist line with its photo and sets a final photo.
    ///
    /// # Errors
    ///
    /// Returns an error when an edit is refused.
    pub async fn gather_evidence(&self, task_id: TaskId) -> Result<Task, eyre::Report> {
        let worker = member(Role::Worker);
        let current = self.service.get_task(&worker, task_id).await?;
        self.service
            .attach_checklist_photo(&worker, task_id, item_id(&current, TILING)?, jpeg(task_id))
            .await?;
        self.service
            .toggle_checklist_item(
                &worker,
                ToggleChecklistItemRequest::new(task_id, item_id(&current, GROUTING)?, true),
            )
            .await?;
        Ok(self
            .service
            .set_final_photo(&member(Role::Foreman), task_id, jpeg(task_id))
            .await?)
    }

    /// Requests a review action as a fresh member holding `role`.
    ///
    /// # Errors
    ///
    /// Returns the service error unchanged.
    pub async fn act(
        &self,
        role: Role,
        task_id: TaskId,
        action: ReviewAction,
        comment: Option<&str>,
    ) -> Result<Task, ReviewError> {
        let request = TransitionRequest::new(task_id, action);
        let with_comment = match comment {
            Some(text) => request.with_comment(text),
            None => request,
        };
        self.service
            .request_transition(&member(role), with_comment)
            .await
    }
}

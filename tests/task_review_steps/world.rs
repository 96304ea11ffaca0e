//! Shared world state for task review BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use siteflow::task::{
    adapters::memory::{InMemoryPhotoStore, InMemoryTaskRepository},
    domain::{Actor, ChecklistItemId, Role, Task, TaskId, UserId},
    ports::PhotoUpload,
    services::{ReviewError, ReviewService},
};

/// Service type used by the BDD world.
pub type TestReviewService =
    ReviewService<InMemoryTaskRepository, InMemoryPhotoStore, DefaultClock>;

/// Scenario world for task review behaviour tests.
pub struct TaskReviewWorld {
    pub repository: Arc<InMemoryTaskRepository>,
    pub photos: Arc<InMemoryPhotoStore>,
    pub service: TestReviewService,
    pub task: Option<Task>,
    pub waiting_task: Option<Task>,
    pub last_result: Option<Result<Task, ReviewError>>,
}

impl TaskReviewWorld {
    /// Creates a world with fresh in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let photos = Arc::new(InMemoryPhotoStore::new());
        let service = ReviewService::new(
            Arc::clone(&repository),
            Arc::clone(&photos),
            Arc::new(DefaultClock),
        );

        Self {
            repository,
            photos,
            service,
            task: None,
            waiting_task: None,
            last_result: None,
        }
    }

    /// Returns the planned task's identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been planned yet.
    pub fn task_id(&self) -> Result<TaskId, eyre::Report> {
        self.task
            .as_ref()
            .map(Task::id)
            .ok_or_else(|| eyre::eyre!("missing planned task in scenario world"))
    }

    /// Returns the identifier of the checklist line at `position`.
    ///
    /// # Errors
    ///
    /// Returns an error when the planned task has no such line.
    pub fn item_at(&self, position: usize) -> Result<ChecklistItemId, eyre::Report> {
        self.task
            .as_ref()
            .and_then(|task| task.checklist().iter().nth(position))
            .map(|line| line.id())
            .ok_or_else(|| eyre::eyre!("missing checklist line {position}"))
    }

    /// Records the outcome of a step and keeps the latest saved task.
    pub fn record(&mut self, result: Result<Task, ReviewError>) {
        if let Ok(ref saved) = result {
            self.task = Some(saved.clone());
        }
        self.last_result = Some(result);
    }
}

impl Default for TaskReviewWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskReviewWorld {
    TaskReviewWorld::default()
}

/// Builds an actor for a role named in a step.
///
/// # Errors
///
/// Returns an error for unknown role names.
pub fn actor_named(role: &str) -> Result<Actor, eyre::Report> {
    let parsed = Role::try_from(role).map_err(|err| eyre::eyre!("invalid role in scenario: {err}"))?;
    Ok(Actor::new(UserId::new(), format!("Scenario {parsed}"), parsed))
}

/// Builds a photo upload for `task_id`.
#[must_use]
pub fn upload(task_id: TaskId) -> PhotoUpload {
    PhotoUpload::new(task_id, "evidence.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE1])
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

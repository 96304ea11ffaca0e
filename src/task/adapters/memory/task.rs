//! In-memory repository for task review flows.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
///
/// Saves are compare-and-swap on the task version under a single write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    dependents_index: HashMap<TaskId, Vec<TaskId>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: &impl ToString) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn index_dependents(state: &mut InMemoryTaskState, task: &Task) {
    for predecessor in task.depends_on() {
        state
            .dependents_index
            .entry(*predecessor)
            .or_default()
            .push(task.id());
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        index_dependents(&mut state, task);
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn save(&self, task: &Task, expected_version: u64) -> TaskRepositoryResult<Task> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        let actual = state
            .tasks
            .get(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?
            .version();
        if actual != expected_version {
            return Err(TaskRepositoryError::ConcurrentModification {
                task_id: task.id(),
                expected: expected_version,
                actual,
            });
        }

        let mut saved = task.clone();
        saved.set_version(actual.saturating_add(1));
        state.tasks.insert(saved.id(), saved.clone());
        Ok(saved)
    }

    async fn find_dependents(&self, id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        let dependents = state
            .dependents_index
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|dependent| state.tasks.get(dependent).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(dependents)
    }
}

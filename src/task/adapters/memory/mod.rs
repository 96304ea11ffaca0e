//! In-memory adapters for tests and local deterministic flows.

mod photo;
mod task;

pub use photo::InMemoryPhotoStore;
pub use task::InMemoryTaskRepository;

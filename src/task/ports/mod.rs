//! Port contracts for task review.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod photo_store;
pub mod repository;

pub use photo_store::{PhotoStore, PhotoStoreError, PhotoStoreResult, PhotoUpload};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};

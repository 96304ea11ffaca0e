//! Photo store port.
//!
//! The review core never reads photo bytes. It hands uploads to the store and
//! keeps only the returned [`PhotoRef`].

use crate::task::domain::{PhotoRef, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for photo store operations.
pub type PhotoStoreResult<T> = Result<T, PhotoStoreError>;

/// A photo handed in by a client, already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    task_id: TaskId,
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Creates an upload for `task_id`.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            task_id,
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Returns the task the photo documents.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the client-side file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the encoded image.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Blob storage for task photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Stores an upload and returns its reference.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoStoreError::EmptyUpload`] for zero-byte uploads or
    /// [`PhotoStoreError::Backend`] when the store is unreachable.
    async fn store(&self, upload: PhotoUpload) -> PhotoStoreResult<PhotoRef>;

    /// Deletes a stored photo.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoStoreError::NotFound`] for unknown references or
    /// [`PhotoStoreError::Backend`] when the store is unreachable.
    async fn delete(&self, photo: &PhotoRef) -> PhotoStoreResult<()>;
}

/// Errors returned by photo store implementations.
#[derive(Debug, Clone, Error)]
pub enum PhotoStoreError {
    /// The upload carried no bytes.
    #[error("photo upload '{0}' is empty")]
    EmptyUpload(String),

    /// No photo is stored under the reference.
    #[error("photo not found: {0}")]
    NotFound(PhotoRef),

    /// Storage backend failure.
    #[error("photo store error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl PhotoStoreError {
    /// Wraps a storage backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

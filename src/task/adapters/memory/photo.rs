//! In-memory photo store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::task::{
    domain::PhotoRef,
    ports::{PhotoStore, PhotoStoreError, PhotoStoreResult, PhotoUpload},
};

/// Thread-safe in-memory photo store.
///
/// References take the form `memory://<task>/<uuid>`. The store can be
/// switched offline to exercise unavailability handling.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPhotoStore {
    state: Arc<RwLock<InMemoryPhotoState>>,
}

#[derive(Debug, Default)]
struct InMemoryPhotoState {
    blobs: HashMap<PhotoRef, PhotoUpload>,
    offline: bool,
}

fn lock_error(err: &impl ToString) -> PhotoStoreError {
    PhotoStoreError::backend(std::io::Error::other(err.to_string()))
}

fn ensure_online(state: &InMemoryPhotoState) -> PhotoStoreResult<()> {
    if state.offline {
        return Err(PhotoStoreError::backend(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "photo store is offline",
        )));
    }
    Ok(())
}

impl InMemoryPhotoStore {
    /// Creates an empty, online store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store offline or back online.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoStoreError::Backend`] when lock acquisition fails.
    pub fn set_offline(&self, offline: bool) -> PhotoStoreResult<()> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        state.offline = offline;
        Ok(())
    }

    /// Returns `true` when a blob is stored under `photo`.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoStoreError::Backend`] when lock acquisition fails.
    pub fn contains(&self, photo: &PhotoRef) -> PhotoStoreResult<bool> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        Ok(state.blobs.contains_key(photo))
    }

    /// Returns the number of stored blobs.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoStoreError::Backend`] when lock acquisition fails.
    pub fn blob_count(&self) -> PhotoStoreResult<usize> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        Ok(state.blobs.len())
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn store(&self, upload: PhotoUpload) -> PhotoStoreResult<PhotoRef> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        ensure_online(&state)?;
        if upload.bytes().is_empty() {
            return Err(PhotoStoreError::EmptyUpload(upload.file_name().to_owned()));
        }
        let photo = PhotoRef::new(format!("memory://{}/{}", upload.task_id(), Uuid::new_v4()))
            .map_err(PhotoStoreError::backend)?;
        state.blobs.insert(photo.clone(), upload);
        Ok(photo)
    }

    async fn delete(&self, photo: &PhotoRef) -> PhotoStoreResult<()> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        ensure_online(&state)?;
        state
            .blobs
            .remove(photo)
            .map(|_| ())
            .ok_or_else(|| PhotoStoreError::NotFound(photo.clone()))
    }
}

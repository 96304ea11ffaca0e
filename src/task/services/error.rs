//! Service-level errors and their stable caller-facing classification.

use crate::task::{
    domain::{Role, TaskDomainError, TaskId},
    ports::{PhotoStoreError, TaskRepositoryError},
};
use std::fmt;
use thiserror::Error;

/// Service-level errors for task review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Photo store operation failed.
    #[error(transparent)]
    PhotoStore(#[from] PhotoStoreError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// A predecessor named at creation does not exist.
    #[error("predecessor task not found: {0}")]
    UnknownPredecessor(TaskId),
    /// The role may not create tasks.
    #[error("{role} may not create tasks")]
    CreateForbidden {
        /// Role of the requesting actor.
        role: Role,
    },
}

/// Result type for task review service operations.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Stable error classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewErrorKind {
    /// The actor's role may not perform the operation in the current status.
    UnauthorizedTransition,
    /// Checklist, photo or scheduling preconditions do not hold.
    PreconditionNotMet,
    /// A rejection lacked a comment.
    MissingComment,
    /// Another writer saved the task first; reload and retry.
    ConcurrentModification,
    /// The task or checklist item does not exist.
    NotFound,
    /// Malformed input.
    InvalidInput,
    /// Photo store or persistence failure.
    Unavailable,
}

impl ReviewErrorKind {
    /// Returns the HTTP-style status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::UnauthorizedTransition => 403,
            Self::PreconditionNotMet => 422,
            Self::MissingComment | Self::InvalidInput => 400,
            Self::ConcurrentModification => 409,
            Self::NotFound => 404,
            Self::Unavailable => 503,
        }
    }

    /// Returns the machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnauthorizedTransition => "unauthorized_transition",
            Self::PreconditionNotMet => "precondition_not_met",
            Self::MissingComment => "missing_comment",
            Self::ConcurrentModification => "concurrent_modification",
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ReviewErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReviewError {
    /// Classifies the error for callers.
    #[must_use]
    pub const fn kind(&self) -> ReviewErrorKind {
        match self {
            Self::Domain(err) => domain_kind(err),
            Self::Repository(err) => match err {
                TaskRepositoryError::DuplicateTask(_) => ReviewErrorKind::InvalidInput,
                TaskRepositoryError::NotFound(_) => ReviewErrorKind::NotFound,
                TaskRepositoryError::ConcurrentModification { .. } => {
                    ReviewErrorKind::ConcurrentModification
                }
                TaskRepositoryError::Persistence(_) => ReviewErrorKind::Unavailable,
            },
            Self::PhotoStore(err) => match err {
                PhotoStoreError::EmptyUpload(_) => ReviewErrorKind::InvalidInput,
                PhotoStoreError::NotFound(_) => ReviewErrorKind::NotFound,
                PhotoStoreError::Backend(_) => ReviewErrorKind::Unavailable,
            },
            Self::NotFound(_) => ReviewErrorKind::NotFound,
            Self::UnknownPredecessor(_) => ReviewErrorKind::InvalidInput,
            Self::CreateForbidden { .. } => ReviewErrorKind::UnauthorizedTransition,
        }
    }

    /// Shorthand for `self.kind().status_code()`.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

const fn domain_kind(err: &TaskDomainError) -> ReviewErrorKind {
    match err {
        TaskDomainError::EmptyTaskTitle
        | TaskDomainError::EmptyChecklistDescription
        | TaskDomainError::ChecklistPositionOutOfRange(_)
        | TaskDomainError::InvalidPhotoRef(_)
        | TaskDomainError::DuplicateChecklistItem(_) => ReviewErrorKind::InvalidInput,
        TaskDomainError::ChecklistItemNotFound { .. } => ReviewErrorKind::NotFound,
        TaskDomainError::UnauthorizedTransition { .. }
        | TaskDomainError::UnauthorizedEdit { .. }
        | TaskDomainError::UnauthorizedRemark { .. } => ReviewErrorKind::UnauthorizedTransition,
        TaskDomainError::PreconditionNotMet { .. } => ReviewErrorKind::PreconditionNotMet,
        TaskDomainError::MissingComment { .. } => ReviewErrorKind::MissingComment,
    }
}

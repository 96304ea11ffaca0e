//! Application services for task review orchestration.

mod error;
mod requests;
mod review;

pub use error::{ReviewError, ReviewErrorKind, ReviewResult};
pub use requests::{
    CreateTaskRequest, NewChecklistItem, ToggleChecklistItemRequest, TransitionRequest,
};
pub use review::{ChecklistToggle, ReviewService};

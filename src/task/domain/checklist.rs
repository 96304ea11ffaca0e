//! Checklist items owned by a task.
//!
//! Completion is only *effective* when an item is completed and carries no
//! outstanding reviewer remark. Every path that completes an item clears the
//! remark, so `is_completed` together with a remark only arises when a
//! reviewer annotates finished work.

use super::{ChecklistItemId, PhotoRef, PreconditionFailure, RemarkGrant, Role, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single line of work on a task checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    id: ChecklistItemId,
    order_index: u32,
    description: String,
    methodology: Option<String>,
    is_photo_required: bool,
    is_completed: bool,
    photo: Option<PhotoRef>,
    remark: Option<String>,
}

/// Parameter object for reconstructing a persisted checklist item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedChecklistItem {
    /// Persisted identifier.
    pub id: ChecklistItemId,
    /// Persisted ordering key.
    pub order_index: u32,
    /// Persisted description.
    pub description: String,
    /// Persisted working method, if any.
    pub methodology: Option<String>,
    /// Whether photo evidence is mandatory.
    pub is_photo_required: bool,
    /// Persisted completion flag.
    pub is_completed: bool,
    /// Persisted photo reference, if any.
    pub photo: Option<PhotoRef>,
    /// Persisted reviewer remark, if any.
    pub remark: Option<String>,
}

/// Result of a successful completion toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Photo detached from the item when it was un-completed.
    pub removed_photo: Option<PhotoRef>,
    /// The item was completed without its required photo and needs follow-up.
    pub needs_photo_follow_up: bool,
}

impl ChecklistItem {
    /// Creates an open checklist item.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyChecklistDescription`] when the
    /// description is blank.
    pub fn new(order_index: u32, description: impl Into<String>) -> Result<Self, TaskDomainError> {
        let trimmed = description.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyChecklistDescription);
        }
        Ok(Self {
            id: ChecklistItemId::new(),
            order_index,
            description: trimmed,
            methodology: None,
            is_photo_required: false,
            is_completed: false,
            photo: None,
            remark: None,
        })
    }

    /// Creates an open item ordered by its zero-based `position`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ChecklistPositionOutOfRange`] when
    /// `position` does not fit an order index, or the errors of
    /// [`Self::new`].
    pub fn at_position(
        position: usize,
        description: impl Into<String>,
    ) -> Result<Self, TaskDomainError> {
        let order_index = u32::try_from(position)
            .map_err(|_| TaskDomainError::ChecklistPositionOutOfRange(position))?;
        Self::new(order_index, description)
    }

    /// Overrides the generated identifier.
    #[must_use]
    pub fn with_id(mut self, id: ChecklistItemId) -> Self {
        self.id = id;
        self
    }

    /// Sets the working method shown to the assignee.
    #[must_use]
    pub fn with_methodology(mut self, methodology: impl Into<String>) -> Self {
        self.methodology = Some(methodology.into());
        self
    }

    /// Marks the item as needing photo evidence. Fixed after creation.
    #[must_use]
    pub fn photo_required(mut self) -> Self {
        self.is_photo_required = true;
        self
    }

    /// Reconstructs an item from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedChecklistItem) -> Self {
        Self {
            id: data.id,
            order_index: data.order_index,
            description: data.description,
            methodology: data.methodology,
            is_photo_required: data.is_photo_required,
            is_completed: data.is_completed,
            photo: data.photo,
            remark: data.remark,
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> ChecklistItemId {
        self.id
    }

    /// Returns the ordering key.
    #[must_use]
    pub const fn order_index(&self) -> u32 {
        self.order_index
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the working method, if any.
    #[must_use]
    pub fn methodology(&self) -> Option<&str> {
        self.methodology.as_deref()
    }

    /// Returns whether photo evidence is mandatory.
    #[must_use]
    pub const fn is_photo_required(&self) -> bool {
        self.is_photo_required
    }

    /// Returns the raw completion flag.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Returns the attached photo, if any.
    #[must_use]
    pub const fn photo(&self) -> Option<&PhotoRef> {
        self.photo.as_ref()
    }

    /// Returns the reviewer remark, if any.
    #[must_use]
    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    /// Completed with no outstanding remark.
    #[must_use]
    pub const fn is_effectively_complete(&self) -> bool {
        self.is_completed && self.remark.is_none()
    }

    /// `false` only for photo-required items without a photo.
    #[must_use]
    pub const fn has_required_photo(&self) -> bool {
        !self.is_photo_required || self.photo.is_some()
    }

    /// Sets the completion flag on behalf of `role`.
    ///
    /// Un-completing an item that holds a photo detaches the photo and needs
    /// `confirm_photo_removal`. Completing a photo-required item without a
    /// photo is only allowed for [`Role::Worker`]; the outcome is then flagged
    /// for follow-up.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionFailure::PhotoRemovalUnconfirmed`] or
    /// [`PreconditionFailure::PhotoRequired`]; the item is left untouched.
    pub fn toggle_complete(
        &mut self,
        requested: bool,
        role: Role,
        confirm_photo_removal: bool,
    ) -> Result<ToggleOutcome, PreconditionFailure> {
        if !requested {
            if self.photo.is_some() && !confirm_photo_removal {
                return Err(PreconditionFailure::PhotoRemovalUnconfirmed { item_id: self.id });
            }
            self.is_completed = false;
            return Ok(ToggleOutcome {
                removed_photo: self.photo.take(),
                needs_photo_follow_up: false,
            });
        }

        let missing_photo = !self.has_required_photo();
        if missing_photo && role != Role::Worker {
            return Err(PreconditionFailure::PhotoRequired { item_id: self.id });
        }
        self.complete();
        Ok(ToggleOutcome {
            removed_photo: None,
            needs_photo_follow_up: missing_photo,
        })
    }

    /// Attaches photo evidence. Uploading evidence implies completion, so the
    /// item ends up completed with its remark cleared.
    ///
    /// Returns the photo it replaced, if any.
    pub fn attach_photo(&mut self, photo: PhotoRef) -> Option<PhotoRef> {
        let replaced = self.photo.replace(photo);
        self.complete();
        replaced
    }

    /// Detaches the photo without touching completion.
    pub fn clear_photo(&mut self) -> Option<PhotoRef> {
        self.photo.take()
    }

    /// Sets or clears the reviewer remark. Blank text clears it.
    ///
    /// The grant proves the caller is reviewing this stage; the item itself
    /// does not judge who reviews whom.
    pub fn set_remark(&mut self, remark: Option<String>, _grant: &RemarkGrant) {
        self.remark = remark
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
    }

    fn complete(&mut self) {
        self.is_completed = true;
        self.remark = None;
    }
}

/// Ordered checklist owned by a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist(Vec<ChecklistItem>);

impl Checklist {
    /// Builds a checklist ordered by `order_index`, keeping insertion order
    /// for ties.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::DuplicateChecklistItem`] when two items share
    /// an identifier.
    pub fn new(items: Vec<ChecklistItem>) -> Result<Self, TaskDomainError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id()) {
                return Err(TaskDomainError::DuplicateChecklistItem(item.id()));
            }
        }
        let mut ordered = items;
        ordered.sort_by_key(ChecklistItem::order_index);
        Ok(Self(ordered))
    }

    /// Iterates over the items in display order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, ChecklistItem> {
        self.0.iter()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the checklist has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up an item by identifier.
    #[must_use]
    pub fn get(&self, id: ChecklistItemId) -> Option<&ChecklistItem> {
        self.0.iter().find(|item| item.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: ChecklistItemId) -> Option<&mut ChecklistItem> {
        self.0.iter_mut().find(|item| item.id() == id)
    }

    /// Number of items that are not effectively complete.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        self.0
            .iter()
            .filter(|item| !item.is_effectively_complete())
            .count()
    }

    /// Number of photo-required items without a photo.
    #[must_use]
    pub fn missing_photo_count(&self) -> usize {
        self.0
            .iter()
            .filter(|item| !item.has_required_photo())
            .count()
    }

    /// Every item effectively complete and every required photo present.
    #[must_use]
    pub fn is_fully_completed_set(&self) -> bool {
        self.0
            .iter()
            .all(|item| item.is_effectively_complete() && item.has_required_photo())
    }

    /// Photos attached to items, in display order.
    #[must_use]
    pub fn photos(&self) -> impl Iterator<Item = &PhotoRef> {
        self.0.iter().filter_map(ChecklistItem::photo)
    }
}

impl<'a> IntoIterator for &'a Checklist {
    type Item = &'a ChecklistItem;
    type IntoIter = std::slice::Iter<'a, ChecklistItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

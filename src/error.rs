/// Error taxonomy for the slot synchronization flow
///
/// Every collaborator failure is converted into a `SlotError` at the
/// boundary of the operation that invoked it. The UI turns a `SlotError`
/// into a modal `Notice` (or nothing, for silent kinds). Saved-state
/// failures never reach this type; the controller logs them.
use thiserror::Error;

use crate::fetch::FetchError;
use crate::state::data::SLOT_COUNT;
use crate::storage::BlobError;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot index {0} is out of range (expected 0..{SLOT_COUNT})")]
    InvalidSlot(usize),

    #[error("Permission to access the photo library is required!")]
    PermissionDenied,

    #[error("image selection was cancelled")]
    SelectionCancelled,

    #[error("Could not get image URI")]
    MissingLocator,

    #[error("Failed to fetch image from URI: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Upload(#[from] BlobError),
}

/// Alert the user has to dismiss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub message: String,
}

impl SlotError {
    /// How (and whether) this failure reaches the user
    pub fn notice(&self) -> Option<Notice> {
        let title = match self {
            SlotError::SelectionCancelled => return None,
            SlotError::PermissionDenied => "Permission required",
            SlotError::InvalidSlot(_) | SlotError::MissingLocator => "Error",
            SlotError::Fetch(_) | SlotError::Upload(_) => "Upload failed",
        };

        Some(Notice {
            title,
            message: self.to_string(),
        })
    }
}

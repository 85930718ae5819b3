/// Media picker
///
/// This module handles:
/// - The permission gate in front of the photo library
/// - Letting the user choose one image
/// - The optional edit step (crop to aspect, re-encode) on the chosen image

pub mod dialog;
pub mod edit;

use async_trait::async_trait;

use crate::fetch::Locator;

pub use dialog::DialogPicker;

/// Answer from the permission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Options for a single-image pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickOptions {
    /// Run the edit step (crop to `aspect`) on the chosen image
    pub allows_editing: bool,
    /// Width:height the edit step crops to
    pub aspect: (u32, u32),
    /// Encoder quality, 0.0 to 1.0
    pub quality: f32,
}

impl Default for PickOptions {
    /// Editing on, 4:3, maximum quality
    fn default() -> Self {
        Self {
            allows_editing: true,
            aspect: (4, 3),
            quality: 1.0,
        }
    }
}

/// What the picker handed back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickResult {
    /// The user backed out
    Cancelled,
    /// The user chose something; the locator may still be unusable (None)
    Picked(Option<Locator>),
}

/// Device media picker
#[async_trait]
pub trait MediaPicker: Send + Sync {
    async fn request_permission(&self) -> Permission;

    async fn pick_image(&self, options: &PickOptions) -> PickResult;
}

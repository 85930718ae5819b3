/// Native picker built on rfd dialogs
///
/// Desktops have no OS permission prompt for the photo library, so the
/// gate is a Yes/No dialog. A grant lasts for the rest of the session;
/// a denial is asked again on the next pick.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};
use tracing::{debug, info, warn};

use super::edit::edit_image;
use super::{MediaPicker, Permission, PickOptions, PickResult};
use crate::fetch::Locator;

/// Image extensions offered in the file dialog
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

pub struct DialogPicker {
    /// Where edited copies of picks are written
    edits_dir: PathBuf,
    granted: AtomicBool,
}

impl DialogPicker {
    pub fn new(edits_dir: PathBuf) -> Self {
        Self {
            edits_dir,
            granted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MediaPicker for DialogPicker {
    async fn request_permission(&self) -> Permission {
        if self.granted.load(Ordering::SeqCst) {
            return Permission::Granted;
        }

        let answer = AsyncMessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title("Photo library access")
            .set_description("Allow Slot Gallery to read images from your photo library?")
            .set_buttons(MessageButtons::YesNo)
            .show()
            .await;

        if matches!(answer, MessageDialogResult::Yes) {
            info!("🔓 Photo library access granted");
            self.granted.store(true, Ordering::SeqCst);
            Permission::Granted
        } else {
            info!("🔒 Photo library access denied");
            Permission::Denied
        }
    }

    async fn pick_image(&self, options: &PickOptions) -> PickResult {
        let picked = AsyncFileDialog::new()
            .set_title("Pick an image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
            .await;

        let Some(handle) = picked else {
            debug!("Image selection was cancelled");
            return PickResult::Cancelled;
        };

        let source = handle.path().to_path_buf();
        debug!("Selected image: {}", source.display());

        if !options.allows_editing {
            return PickResult::Picked(Locator::from_path(&source));
        }

        // Decoding and encoding are CPU-bound
        let options = *options;
        let edits_dir = self.edits_dir.clone();
        let edited = tokio::task::spawn_blocking(move || edit_image(&source, &options, &edits_dir))
            .await;

        match edited {
            Ok(Ok(path)) => PickResult::Picked(Locator::from_path(&path)),
            Ok(Err(e)) => {
                warn!("⚠️  Could not edit picked image: {}", e);
                PickResult::Picked(None)
            }
            Err(e) => {
                warn!("⚠️  Edit task failed: {}", e);
                PickResult::Picked(None)
            }
        }
    }
}

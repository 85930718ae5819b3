/// Slot synchronization controller
///
/// Owns the grid and keeps three copies consistent: the in-memory grid
/// (what the UI shows), the saved grid in the state store, and the
/// uploaded objects in the blob store.
///
/// - The in-memory grid lives in a `watch` channel: `snapshot()` reads it,
///   `subscribe()` hands out change notifications, and every update is a
///   single read-modify-write of one index against the current value.
/// - Each upload takes a per-slot ticket when it starts. Its result is only
///   applied if no newer upload for that slot started in the meantime and
///   the slot wasn't cancelled.
/// - Saves are full overwrites, serialized by `saves`, and always write
///   the snapshot taken under the lock. Until `initialize()` has merged
///   the saved grid in, saves are held back and flushed by `initialize()`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

use super::data::{GridState, Slot, SlotIndex, SLOT_COUNT};
use super::library::{StateStore, StoreError, GRID_STATE_KEY};
use crate::error::SlotError;
use crate::fetch::{fetch_bytes, Locator};
use crate::picker::{MediaPicker, Permission, PickOptions, PickResult};
use crate::storage::BlobStore;

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 64;

/// How a successful select/upload chain ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The slot now shows `url`
    Uploaded { url: String },
    /// Uploaded, but a newer upload (or a cancel) for the slot took over
    Superseded { url: String },
}

/// Observable side effects, including the ones that are never shown to
/// the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    Restored { filled: usize },
    RestoreFailed { reason: String },
    SlotUpdated { slot: SlotIndex, url: String },
    StaleUploadIgnored { slot: SlotIndex, url: String },
    Persisted,
    PersistenceFailed { reason: String },
}

/// Guarded by `SlotController::saves`
#[derive(Debug, Default)]
struct SaveState {
    /// The saved grid has been read and merged
    restored: bool,
    /// A save was requested before that happened
    deferred: bool,
}

pub struct SlotController {
    grid: watch::Sender<GridState>,
    tickets: [AtomicU64; SLOT_COUNT],
    /// Uploads started per slot that haven't resolved yet
    in_flight: [AtomicUsize; SLOT_COUNT],
    saves: Mutex<SaveState>,
    events: broadcast::Sender<SlotEvent>,
    store: Arc<dyn StateStore>,
    blobs: Arc<dyn BlobStore>,
    picker: Arc<dyn MediaPicker>,
}

impl SlotController {
    /// Controller with ten empty slots; call `initialize()` to restore
    pub fn new(
        store: Arc<dyn StateStore>,
        blobs: Arc<dyn BlobStore>,
        picker: Arc<dyn MediaPicker>,
    ) -> Self {
        let (grid, _) = watch::channel(GridState::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            grid,
            tickets: Default::default(),
            in_flight: Default::default(),
            saves: Mutex::new(SaveState::default()),
            events,
            store,
            blobs,
            picker,
        }
    }

    /// Current grid
    pub fn snapshot(&self) -> GridState {
        self.grid.borrow().clone()
    }

    /// Receiver that wakes on every grid change
    pub fn subscribe(&self) -> watch::Receiver<GridState> {
        self.grid.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SlotEvent> {
        self.events.subscribe()
    }

    /// Restore the saved grid
    ///
    /// Missing or unreadable saved state leaves the grid as it is (all
    /// empty at startup); the failure is logged, never surfaced. Slots an
    /// upload already filled before this resolves are kept, and their
    /// held-back save is written once the merge is done.
    pub async fn initialize(&self) -> GridState {
        // No save can overwrite the stored grid before it has been read
        let mut saves = self.saves.lock().await;

        match self.load_saved().await {
            Ok(Some(saved)) => {
                let filled = saved.filled_count();
                self.grid.send_if_modified(|grid| {
                    let mut changed = false;
                    for (index, slot) in saved.iter() {
                        if slot.is_filled() && !grid.get(index).is_filled() {
                            grid.set(index, slot.clone());
                            changed = true;
                        }
                    }
                    changed
                });
                info!("🎨 Restored grid with {} filled slots", filled);
                self.emit(SlotEvent::Restored { filled });
            }
            Ok(None) => {
                info!("🎨 No saved grid, starting empty");
                self.emit(SlotEvent::Restored { filled: 0 });
            }
            Err(e) => {
                warn!("Failed to load images: {}", e);
                self.emit(SlotEvent::RestoreFailed {
                    reason: e.to_string(),
                });
            }
        }

        saves.restored = true;
        if std::mem::take(&mut saves.deferred) {
            self.write_snapshot().await;
        }
        drop(saves);

        self.snapshot()
    }

    async fn load_saved(&self) -> Result<Option<GridState>, StoreError> {
        let Some(json) = self.store.get(GRID_STATE_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(GridState::from_json(&json)?))
    }

    /// Full select flow for one tile: permission, pick, upload
    pub async fn select_image(&self, slot: SlotIndex) -> Result<SelectOutcome, SlotError> {
        if self.picker.request_permission().await == Permission::Denied {
            info!(slot = slot.get(), "Photo library permission denied");
            return Err(SlotError::PermissionDenied);
        }

        let locator = match self.picker.pick_image(&PickOptions::default()).await {
            PickResult::Cancelled => {
                debug!(slot = slot.get(), "Image selection was canceled");
                return Err(SlotError::SelectionCancelled);
            }
            PickResult::Picked(None) => {
                warn!(slot = slot.get(), "Picker returned no usable image URI");
                return Err(SlotError::MissingLocator);
            }
            PickResult::Picked(Some(locator)) => locator,
        };

        debug!(slot = slot.get(), %locator, "Selected image");
        self.upload_image(&locator, slot).await
    }

    /// Fetch, upload and record the image behind `locator` in `slot`
    ///
    /// On any failure the grid is left exactly as it was.
    pub async fn upload_image(
        &self,
        locator: &Locator,
        slot: SlotIndex,
    ) -> Result<SelectOutcome, SlotError> {
        let ticket = self.begin_upload(slot);
        info!(slot = slot.get(), %locator, "Uploading image");

        let stored = self.store_remote(locator).await;
        let applied = match &stored {
            Ok(url) => self.apply_index_update(slot, ticket, url),
            Err(_) => false,
        };
        self.in_flight[slot.get()].fetch_sub(1, Ordering::SeqCst);

        let url =
            stored.inspect_err(|e| error!(slot = slot.get(), "Error uploading image: {}", e))?;
        info!(slot = slot.get(), "File available at: {}", url);

        if !applied {
            info!(slot = slot.get(), "Newer upload owns this slot, ignoring {}", url);
            self.emit(SlotEvent::StaleUploadIgnored {
                slot,
                url: url.clone(),
            });
            return Ok(SelectOutcome::Superseded { url });
        }

        self.emit(SlotEvent::SlotUpdated {
            slot,
            url: url.clone(),
        });
        self.persist().await;

        Ok(SelectOutcome::Uploaded { url })
    }

    async fn store_remote(&self, locator: &Locator) -> Result<String, SlotError> {
        let bytes = fetch_bytes(locator).await?;
        let name = locator.object_name().ok_or(SlotError::MissingLocator)?;

        self.blobs.upload(name, bytes).await?;
        Ok(self.blobs.public_url(name).await?)
    }

    /// Drop the result of any upload for `slot` that is still in flight
    ///
    /// Returns false (and does nothing) when no upload for the slot has
    /// started, e.g. while the picker is still open.
    pub fn cancel(&self, slot: SlotIndex) -> bool {
        if self.in_flight[slot.get()].load(Ordering::SeqCst) == 0 {
            debug!(slot = slot.get(), "Nothing to cancel");
            return false;
        }
        self.tickets[slot.get()].fetch_add(1, Ordering::SeqCst);
        info!(slot = slot.get(), "Cancelled in-flight upload");
        true
    }

    fn begin_upload(&self, slot: SlotIndex) -> u64 {
        self.in_flight[slot.get()].fetch_add(1, Ordering::SeqCst);
        self.tickets[slot.get()].fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Set `slot` to `url` if `ticket` is still the newest for the slot
    ///
    /// Runs against whatever the grid is right now, so concurrent uploads
    /// for other slots are never overwritten with a stale copy.
    fn apply_index_update(&self, slot: SlotIndex, ticket: u64, url: &str) -> bool {
        self.grid.send_if_modified(|grid| {
            if self.tickets[slot.get()].load(Ordering::SeqCst) != ticket {
                return false;
            }
            grid.set(slot, Slot::Filled(url.to_string()));
            true
        })
    }

    /// Save the whole grid; failures are logged and reported as events only
    async fn persist(&self) {
        let mut saves = self.saves.lock().await;
        if !saves.restored {
            debug!("Saved grid not restored yet, holding the save back");
            saves.deferred = true;
            return;
        }
        self.write_snapshot().await;
    }

    /// Caller holds `saves`
    async fn write_snapshot(&self) {
        let snapshot = self.snapshot();

        let result = match snapshot.to_json() {
            Ok(json) => self.store.set(GRID_STATE_KEY, &json).await,
            Err(e) => Err(StoreError::from(e)),
        };

        match result {
            Ok(()) => {
                debug!("Saved grid ({} filled)", snapshot.filled_count());
                self.emit(SlotEvent::Persisted);
            }
            Err(e) => {
                warn!("Failed to save images: {}", e);
                self.emit(SlotEvent::PersistenceFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: SlotEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

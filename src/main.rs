use std::collections::HashMap;
use std::sync::Arc;

use iced::widget::{column, container, image, scrollable, text};
use iced::{Alignment, Element, Length, Subscription, Task, Theme};
use rfd::{AsyncMessageDialog, MessageButtons, MessageLevel};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod fetch;
mod picker;
mod state;
mod storage;
mod ui;

#[cfg(test)]
mod testing;

use config::{BlobBackend, Config, LogFormat};
use error::Notice;
use fetch::{fetch_bytes, Locator};
use picker::edit::default_edit_cache_dir;
use picker::DialogPicker;
use state::controller::{SelectOutcome, SlotController};
use state::data::{GridState, SlotIndex, SLOT_COUNT};
use state::library::{MemoryStateStore, SqliteStateStore, StateStore};
use storage::{BlobStore, BucketClient, LocalBlobStore};
use ui::tile::{grid_view, TileView};

/// Main application state
struct SlotGallery {
    controller: Arc<SlotController>,
    /// Last grid the controller published
    grid: GridState,
    /// Decoded previews by slot URL
    previews: HashMap<String, image::Handle>,
    /// Select flows running per slot (picker open or uploading)
    busy: [usize; SLOT_COUNT],
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Saved grid finished loading
    Restored(GridState),
    /// Controller published a new grid
    GridChanged(GridState),
    /// User clicked a tile
    SlotPressed(SlotIndex),
    /// User right-clicked a tile
    CancelPressed(SlotIndex),
    /// A select flow ended; `Err(None)` is a silent failure
    SelectionFinished(SlotIndex, Result<SelectOutcome, Option<Notice>>),
    PreviewLoaded(String, Option<image::Handle>),
    NoticeDismissed,
}

impl SlotGallery {
    fn new(controller: Arc<SlotController>) -> (Self, Task<Message>) {
        let restore = {
            let controller = controller.clone();
            Task::perform(
                async move { controller.initialize().await },
                Message::Restored,
            )
        };

        (
            SlotGallery {
                grid: controller.snapshot(),
                controller,
                previews: HashMap::new(),
                busy: [0; SLOT_COUNT],
                status: "Loading saved images...".to_string(),
            },
            restore,
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Restored(restored) => {
                self.status = format!(
                    "Ready. {} of {} slots filled.",
                    restored.filled_count(),
                    SLOT_COUNT
                );
                // An upload may have landed since `restored` was taken
                self.show_grid(self.controller.snapshot())
            }
            Message::GridChanged(grid) => self.show_grid(grid),
            Message::SlotPressed(slot) => {
                self.busy[slot.get()] += 1;
                let controller = self.controller.clone();
                Task::perform(
                    async move { controller.select_image(slot).await.map_err(|e| e.notice()) },
                    move |result| Message::SelectionFinished(slot, result),
                )
            }
            Message::CancelPressed(slot) => {
                if self.controller.cancel(slot) {
                    self.status = format!("Cancelled upload for slot {}.", slot.get() + 1);
                }
                Task::none()
            }
            Message::SelectionFinished(slot, result) => {
                self.busy[slot.get()] = self.busy[slot.get()].saturating_sub(1);
                match result {
                    Ok(SelectOutcome::Uploaded { .. }) => {
                        self.status = format!("✅ Slot {} updated.", slot.get() + 1);
                        Task::none()
                    }
                    Ok(SelectOutcome::Superseded { .. }) | Err(None) => Task::none(),
                    Err(Some(notice)) => {
                        Task::perform(show_notice(notice), |()| Message::NoticeDismissed)
                    }
                }
            }
            Message::PreviewLoaded(url, handle) => {
                match handle {
                    Some(handle) => {
                        self.previews.insert(url, handle);
                    }
                    None => warn!("⚠️  Could not load preview for {}", url),
                }
                Task::none()
            }
            Message::NoticeDismissed => Task::none(),
        }
    }

    /// Take a new grid and start loading previews it is missing
    fn show_grid(&mut self, grid: GridState) -> Task<Message> {
        self.previews
            .retain(|url, _| grid.iter().any(|(_, slot)| slot.url() == Some(url.as_str())));

        let loads: Vec<Task<Message>> = grid
            .iter()
            .filter_map(|(_, slot)| slot.url())
            .filter(|url| !self.previews.contains_key(*url))
            .map(|url| {
                let url = url.to_string();
                Task::perform(load_preview(url.clone()), move |handle| {
                    Message::PreviewLoaded(url.clone(), handle)
                })
            })
            .collect();

        self.grid = grid;
        Task::batch(loads)
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let grid = grid_view(&self.grid, |slot, value| TileView {
            slot,
            value,
            preview: value.url().and_then(|url| self.previews.get(url)),
            busy: self.busy[slot.get()] > 0,
        });

        let content = column![
            text("Slot Gallery").size(32),
            scrollable(grid.width(Length::Fill)).height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(16)
        .padding(20)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Forward controller grid updates into the app
    fn subscription(&self) -> Subscription<Message> {
        let changes = self.controller.subscribe();
        Subscription::run_with_id(
            "grid-changes",
            futures::stream::unfold(changes, |mut changes| async move {
                changes.changed().await.ok()?;
                let grid = changes.borrow_and_update().clone();
                Some((Message::GridChanged(grid), changes))
            }),
        )
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Modal alert with a title and message
async fn show_notice(notice: Notice) {
    AsyncMessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(notice.title)
        .set_description(notice.message)
        .set_buttons(MessageButtons::Ok)
        .show()
        .await;
}

async fn load_preview(url: String) -> Option<image::Handle> {
    match fetch_bytes(&Locator::new(url)).await {
        Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
        Err(e) => {
            warn!("⚠️  Preview fetch failed: {}", e);
            None
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Wire the controller to the configured collaborators
async fn build_controller(config: &Config) -> anyhow::Result<SlotController> {
    let db_path = SqliteStateStore::db_path_in(&config.data_dir);
    let store: Arc<dyn StateStore> = match SqliteStateStore::open(db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("⚠️  State database unavailable, changes won't survive a restart: {}", e);
            Arc::new(MemoryStateStore::new())
        }
    };

    let blobs: Arc<dyn BlobStore> = match &config.backend {
        BlobBackend::Local => Arc::new(LocalBlobStore::new(config.blobs_dir())?),
        BlobBackend::S3 {
            bucket,
            endpoint,
            public_url,
        } => {
            let s3_config = config::s3_client_config(endpoint.as_deref()).await;
            let client = aws_sdk_s3::Client::from_conf(s3_config);
            Arc::new(BucketClient::new(client, bucket.clone(), public_url.clone())?)
        }
    };

    let edits_dir = default_edit_cache_dir().unwrap_or_else(|| config.data_dir.join("edits"));
    let picker = Arc::new(DialogPicker::new(edits_dir));

    Ok(SlotController::new(store, blobs, picker))
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    info!("🎨 Slot Gallery starting, data in {}", config.data_dir.display());

    // Kept alive for the whole run; the S3 client is built on it
    let runtime = tokio::runtime::Runtime::new()?;
    let controller = Arc::new(runtime.block_on(build_controller(&config))?);

    iced::application("Slot Gallery", SlotGallery::update, SlotGallery::view)
        .subscription(SlotGallery::subscription)
        .theme(SlotGallery::theme)
        .centered()
        .run_with(move || SlotGallery::new(controller))?;

    drop(runtime);
    Ok(())
}

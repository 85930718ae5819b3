/// Grid tiles
/// One tile per slot: the slot's image (or a placeholder), clickable to
/// pick, right-clickable to cancel an upload in flight.
use iced::widget::{button, center, column, image, mouse_area, row, text, Column};
use iced::{ContentFit, Element, Length};

use crate::state::data::{GridState, Slot, SlotIndex};
use crate::Message;

/// Tiles per row
pub const COLUMNS: usize = 2;

const TILE_HEIGHT: f32 = 180.0;

/// What a single tile has to show
pub struct TileView<'a> {
    pub slot: SlotIndex,
    pub value: &'a Slot,
    /// Decoded preview for a filled slot, once loaded
    pub preview: Option<&'a image::Handle>,
    /// A select flow for this slot is running
    pub busy: bool,
}

impl<'a> TileView<'a> {
    pub fn view(self) -> Element<'a, Message> {
        let body: Element<'a, Message> = match (self.value, self.preview) {
            (Slot::Filled(_), Some(handle)) => image(handle.clone())
                .content_fit(ContentFit::Cover)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            (Slot::Filled(_), None) => center(text("Loading…").size(14)).into(),
            (Slot::Empty, _) => center(text("Tap to pick an image").size(14)).into(),
        };

        let body: Element<'a, Message> = if self.busy {
            column![body, text("Working… (right-click cancels the upload)").size(12)]
                .spacing(4)
                .into()
        } else {
            body
        };

        let tile = button(body)
            .on_press(Message::SlotPressed(self.slot))
            .width(Length::Fill)
            .height(Length::Fixed(TILE_HEIGHT))
            .padding(4);

        mouse_area(tile)
            .on_right_press(Message::CancelPressed(self.slot))
            .into()
    }
}

/// Lay the grid out in rows of `COLUMNS` tiles
pub fn grid_view<'a, F>(grid: &'a GridState, mut tile: F) -> Column<'a, Message>
where
    F: FnMut(SlotIndex, &'a Slot) -> TileView<'a>,
{
    let tiles: Vec<Element<'a, Message>> = grid
        .iter()
        .map(|(index, value)| tile(index, value).view())
        .collect();

    let mut rows = Column::new().spacing(8);
    let mut tiles = tiles.into_iter().peekable();
    while tiles.peek().is_some() {
        let cells: Vec<Element<'a, Message>> = tiles.by_ref().take(COLUMNS).collect();
        rows = rows.push(row(cells).spacing(8));
    }
    rows
}

/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the saved-state layer, the controller and the UI layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SlotError;

/// Number of tiles in the grid. Never changes at runtime.
pub const SLOT_COUNT: usize = 10;

/// A single grid position
///
/// Serialized as `null` (empty) or the remote URL string, which is the
/// layout the saved grid uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Slot {
    /// No image picked/uploaded yet
    #[default]
    Empty,
    /// Remote, fetchable URL returned by the blob store
    Filled(String),
}

impl Slot {
    pub fn url(&self) -> Option<&str> {
        match self {
            Slot::Empty => None,
            Slot::Filled(url) => Some(url),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }
}

impl From<Option<String>> for Slot {
    fn from(value: Option<String>) -> Self {
        match value {
            // An empty string never pointed anywhere
            Some(url) if !url.is_empty() => Slot::Filled(url),
            _ => Slot::Empty,
        }
    }
}

impl From<Slot> for Option<String> {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Empty => None,
            Slot::Filled(url) => Some(url),
        }
    }
}

/// Validated index into the grid (0..SLOT_COUNT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(usize);

impl SlotIndex {
    pub fn new(index: usize) -> Result<Self, SlotError> {
        if index < SLOT_COUNT {
            Ok(Self(index))
        } else {
            Err(SlotError::InvalidSlot(index))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Every slot, in grid order
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..SLOT_COUNT).map(SlotIndex)
    }
}

impl TryFrom<usize> for SlotIndex {
    type Error = SlotError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The whole grid: exactly `SLOT_COUNT` slots in positional order
///
/// The fixed-size array makes "always ten entries" a type-level fact;
/// a saved array of any other length fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridState([Slot; SLOT_COUNT]);

impl GridState {
    /// Ten empty slots
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: SlotIndex) -> &Slot {
        &self.0[index.get()]
    }

    /// Replace one slot in place
    pub fn set(&mut self, index: SlotIndex, slot: Slot) {
        self.0[index.get()] = slot;
    }

    /// Copy of this grid with one slot replaced
    #[cfg(test)]
    pub fn with_slot(&self, index: SlotIndex, slot: Slot) -> Self {
        let mut next = self.clone();
        next.set(index, slot);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &Slot)> {
        SlotIndex::all().zip(self.0.iter())
    }

    pub fn filled_count(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_filled()).count()
    }

    /// Convert to JSON string for the state store
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from the state store)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(index: usize) -> SlotIndex {
        SlotIndex::new(index).unwrap()
    }

    #[test]
    fn test_default_grid_is_all_empty() {
        let grid = GridState::new();
        assert_eq!(grid.iter().count(), SLOT_COUNT);
        assert_eq!(grid.filled_count(), 0);
    }

    #[test]
    fn test_json_layout() {
        let grid = GridState::new().with_slot(slot(0), Slot::Filled("https://cdn/a.jpg".into()));
        let json = grid.to_json().unwrap();
        assert_eq!(
            json,
            r#"["https://cdn/a.jpg",null,null,null,null,null,null,null,null,null]"#
        );
    }

    #[test]
    fn test_serialization_round_trip() {
        let grid = GridState::new()
            .with_slot(slot(3), Slot::Filled("https://cdn/three.jpg".into()))
            .with_slot(slot(9), Slot::Filled("https://cdn/nine.jpg".into()));

        let restored = GridState::from_json(&grid.to_json().unwrap()).unwrap();

        assert_eq!(grid, restored);
        assert_eq!(restored.filled_count(), 2);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert!(GridState::from_json(r#"[null, null]"#).is_err());
        assert!(GridState::from_json(r#"{"images": []}"#).is_err());
        assert!(GridState::from_json("not json").is_err());
    }

    #[test]
    fn test_empty_string_loads_as_empty_slot() {
        let grid = GridState::from_json(r#"["",null,null,null,null,null,null,null,null,null]"#)
            .unwrap();
        assert_eq!(grid.get(slot(0)), &Slot::Empty);
    }

    #[test]
    fn test_slot_index_bounds() {
        assert!(SlotIndex::new(0).is_ok());
        assert!(SlotIndex::new(SLOT_COUNT - 1).is_ok());
        assert!(matches!(
            SlotIndex::try_from(SLOT_COUNT),
            Err(SlotError::InvalidSlot(10))
        ));
    }

    #[test]
    fn test_with_slot_leaves_original_untouched() {
        let grid = GridState::new();
        let next = grid.with_slot(slot(4), Slot::Filled("https://cdn/x.jpg".into()));
        assert_eq!(grid.filled_count(), 0);
        assert_eq!(next.get(slot(4)).url(), Some("https://cdn/x.jpg"));
    }
}

/// UI widgets
pub mod tile;

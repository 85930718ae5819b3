/// State management module
///
/// This module handles all application state, including:
/// - The grid of ten slots and its saved form (data.rs)
/// - The local key-value store the grid is saved in (library.rs)
/// - Keeping the grid, the store and blob storage in sync (controller.rs)

pub mod controller;
pub mod data;
pub mod library;

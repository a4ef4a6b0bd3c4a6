//! Watermark tiling: layout math and the pixel compositor.

pub mod composite;
pub mod tiling;

pub use composite::place_watermark;
pub use tiling::{TileAxis, TileLayout};

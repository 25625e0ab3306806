//! Raster drawing: the surface, fonts, fill colors and text direction.

pub mod bidi;
pub mod color;
pub mod font;
mod surface;

pub use font::{Face, FontBook, LineStyle, LoadedFont, font_family_for};
pub use surface::{Surface, TextState, TextSurface};

//! Core library for personalized greeting cards: template model, text
//! compositing, card rendering, PNG export and bulk ZIP export.

pub mod bulk;
pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod raster;
pub mod render;
pub mod store;
pub mod template;

pub use bulk::{BulkOptions, BulkReport, CollisionPolicy, FailurePolicy, bulk_render};
pub use compositor::composite;
pub use config::Config;
pub use error::{CardError, Result};
pub use export::{encode_png, export_single};
pub use loader::{ImageLoader, SourceLoader};
pub use raster::{FontBook, Surface, TextState, TextSurface};
pub use render::CardRenderer;
pub use store::{JsonTemplateStore, MemoryTemplateStore, TemplateStore};
pub use template::{Alignment, CardTemplate, Direction, TextRegion};

/// Render `template` for `name` on a fresh surface and return the PNG bytes.
pub async fn render_to_png<L: ImageLoader>(
    renderer: &CardRenderer<L>,
    template: &CardTemplate,
    name: &str,
) -> Result<Vec<u8>> {
    let mut surface = renderer.surface();
    renderer.render(&mut surface, template, name).await?;
    encode_png(&surface)
}

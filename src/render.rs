//! Card rendering: background first, then every region in paint order.

use std::sync::Arc;

use tracing::{debug, info};

use crate::compositor::composite;
use crate::error::Result;
use crate::loader::ImageLoader;
use crate::raster::{FontBook, Surface};
use crate::template::CardTemplate;

/// Renders templates onto a [`Surface`] using one image loader and font book.
pub struct CardRenderer<L> {
    loader: L,
    fonts: Arc<FontBook>,
}

impl<L: ImageLoader> CardRenderer<L> {
    pub fn new(loader: L, fonts: Arc<FontBook>) -> Self {
        Self { loader, fonts }
    }

    /// A blank surface sharing this renderer's fonts.
    pub fn surface(&self) -> Surface {
        Surface::new(Arc::clone(&self.fonts))
    }

    pub fn fonts(&self) -> &Arc<FontBook> {
        &self.fonts
    }

    /// Redraw `surface` from scratch for `name`.
    ///
    /// The surface is resized (and cleared) before the background loads; if
    /// loading fails it stays blank and no text is drawn. An empty `name`
    /// leaves `[name]` tokens as they are.
    pub async fn render(&self, surface: &mut Surface, template: &CardTemplate, name: &str) -> Result<()> {
        surface.resize(template.image_width, template.image_height);

        let background = self.loader.load(&template.image_url).await?;
        surface.draw_background(&background);

        for region in &template.text_areas {
            let text = region.resolve(name);
            debug!(region = %region.id, text = %text, "drawing region");
            composite(surface, region, &text);
        }
        info!(
            template = %template.id,
            regions = template.text_areas.len(),
            "card rendered"
        );
        Ok(())
    }
}

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::warn;

use crate::raster::color::{BLACK, parse_color};
use crate::raster::font::{FontBook, LineStyle};
use crate::template::{Alignment, Direction};

/// Text drawing state, set once per region before measuring or drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextState {
    pub font_family: String,
    pub font_size: u32,
    pub fill: String,
    pub align: Alignment,
    pub direction: Direction,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 10,
            fill: "#000000".to_string(),
            align: Alignment::Left,
            direction: Direction::Ltr,
        }
    }
}

/// Text primitives the compositor needs from a drawing surface.
pub trait TextSurface {
    fn set_text_state(&mut self, state: TextState);
    /// Advance width of `text` under the current state.
    fn measure_text(&self, text: &str) -> f32;
    /// Draw `text` with its baseline at `y`. `x` is the anchor: the left
    /// edge, the center or the right edge depending on the alignment.
    fn fill_text(&mut self, text: &str, x: f32, y: f32);
}

/// RGBA raster onto which the background and text are composited.
pub struct Surface {
    canvas: RgbaImage,
    state: TextState,
    fill: Rgba<u8>,
    fonts: Arc<FontBook>,
}

impl Surface {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self {
            canvas: RgbaImage::new(0, 0),
            state: TextState::default(),
            fill: BLACK,
            fonts,
        }
    }

    /// Resize to `width x height`, discarding previous content and text state.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::new(width, height);
        self.state = TextState::default();
        self.fill = BLACK;
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Draw `image` stretched over the whole surface.
    pub fn draw_background(&mut self, image: &DynamicImage) {
        let (w, h) = self.canvas.dimensions();
        let rgba = image.to_rgba8();
        let scaled = if rgba.dimensions() == (w, h) {
            rgba
        } else {
            imageops::resize(&rgba, w, h, FilterType::Triangle)
        };
        imageops::overlay(&mut self.canvas, &scaled, 0, 0);
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }
}

impl TextSurface for Surface {
    fn set_text_state(&mut self, state: TextState) {
        match parse_color(&state.fill) {
            Some(color) => self.fill = color,
            // An unparseable color leaves the previous fill in place.
            None => warn!(color = %state.fill, "ignoring unparseable fill color"),
        }
        self.state = state;
    }

    fn measure_text(&self, text: &str) -> f32 {
        let face = self.fonts.resolve(&self.state.font_family);
        face.measure(&printable(text), self.state.font_size as f32, self.state.direction)
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let style = LineStyle {
            px: self.state.font_size as f32,
            color: self.fill,
            direction: self.state.direction,
        };
        let text = printable(text);
        let face = self.fonts.resolve(&self.state.font_family);
        let width = face.measure(&text, style.px, style.direction);
        let left = match self.state.align {
            Alignment::Left => x,
            Alignment::Center => x - width / 2.0,
            Alignment::Right => x - width,
        };
        face.draw(&mut self.canvas, &text, left, y, style);
    }
}

/// Line breaks and tabs are drawn as plain spaces.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(w: u32, h: u32) -> Surface {
        let mut s = Surface::new(Arc::new(FontBook::new()));
        s.resize(w, h);
        s
    }

    fn ink_columns(s: &Surface) -> (u32, u32) {
        let xs: Vec<u32> = s
            .canvas()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, _, _)| x)
            .collect();
        (*xs.iter().min().unwrap(), *xs.iter().max().unwrap())
    }

    fn state(align: Alignment) -> TextState {
        TextState {
            font_family: "Arial".into(),
            font_size: 20,
            fill: "#ff0000".into(),
            align,
            direction: Direction::Ltr,
        }
    }

    #[test]
    fn resize_clears_content() {
        let mut s = surface(4, 4);
        s.draw_background(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            2,
            Rgba([1, 2, 3, 255]),
        )));
        assert_eq!(s.canvas().get_pixel(3, 3), &Rgba([1, 2, 3, 255]));
        s.resize(4, 4);
        assert!(s.canvas().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn alignment_moves_text_relative_to_anchor() {
        // "II" is 24px wide at 20px; the glyph ink spans cells 1..4 of each 6.
        let mut left = surface(200, 40);
        left.set_text_state(state(Alignment::Left));
        left.fill_text("II", 100.0, 30.0);
        assert_eq!(ink_columns(&left), (102, 119));

        let mut right = surface(200, 40);
        right.set_text_state(state(Alignment::Right));
        right.fill_text("II", 100.0, 30.0);
        assert_eq!(ink_columns(&right), (78, 95));

        let mut center = surface(200, 40);
        center.set_text_state(state(Alignment::Center));
        center.fill_text("II", 100.0, 30.0);
        assert_eq!(ink_columns(&center), (90, 107));
    }

    #[test]
    fn outline_text_right_aligns_to_anchor() {
        let mut fonts = FontBook::new();
        fonts
            .add_font("DejaVu Sans", include_bytes!("../../tests/fixtures/DejaVuSans.ttf").to_vec())
            .unwrap();
        let mut s = Surface::new(Arc::new(fonts));
        s.resize(300, 60);
        s.set_text_state(TextState {
            font_family: "DejaVu Sans".into(),
            ..state(Alignment::Right)
        });
        let width = s.measure_text("Happy Eid");
        assert!(width > 0.0);
        s.fill_text("Happy Eid", 250.0, 40.0);
        let (first, last) = ink_columns(&s);
        assert!(last <= 250, "ink ends at {last}");
        assert!(first as f32 >= 250.0 - width - 1.0);
    }

    #[test]
    fn bad_color_keeps_previous_fill() {
        let mut s = surface(50, 30);
        s.set_text_state(TextState {
            fill: "chartreuse-ish".into(),
            ..state(Alignment::Left)
        });
        s.fill_text("I", 0.0, 20.0);
        assert!(s.canvas().pixels().any(|p| p.0 == [0, 0, 0, 255]));
    }
}

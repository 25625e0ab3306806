//! Placement of a region's resolved text: anchor, line breaks and baselines.

use std::mem;

use tracing::debug;

use crate::raster::{TextState, TextSurface};
use crate::template::{Alignment, TextRegion};

/// Extra space between wrapped lines, on top of the font size.
pub const LINE_GAP: f32 = 5.0;

/// One line ready to be drawn at `(x, y)`, `y` being the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Horizontal anchor handed to the surface for the region's alignment.
pub fn anchor_x(region: &TextRegion) -> f32 {
    let (x, width) = (region.x as f32, region.width as f32);
    match region.alignment {
        Alignment::Left => x,
        Alignment::Center => x + width / 2.0,
        Alignment::Right => x + width,
    }
}

/// Text state derived from a region's style.
pub fn text_state(region: &TextRegion) -> TextState {
    TextState {
        font_family: region.font_family.clone(),
        font_size: region.font_size,
        fill: region.color.clone(),
        align: region.alignment,
        direction: region.direction,
    }
}

/// Break `text` into lines for `region`, measuring candidates with `measure`.
///
/// Text without spaces or newlines is a single line centered vertically at
/// `y + height/2 + fontSize/3`. Anything else is greedily word-wrapped from
/// `y + fontSize`, one line every `fontSize + 5` pixels. Early lines keep
/// their trailing separator space, so right and center aligned lines sit one
/// space left of the last line; only the last line is trimmed. Lines are
/// never truncated; text taller than the region overflows downward.
pub fn layout<M>(region: &TextRegion, text: &str, measure: M) -> Vec<PlacedLine>
where
    M: Fn(&str) -> f32,
{
    let x = anchor_x(region);
    let font_size = region.font_size as f32;

    if !text.contains(' ') && !text.contains('\n') {
        let y = region.y as f32 + region.height as f32 / 2.0 + font_size / 3.0;
        return vec![PlacedLine {
            text: text.to_string(),
            x,
            y,
        }];
    }

    let baseline = |index: usize| region.y as f32 + font_size + index as f32 * (font_size + LINE_GAP);
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split(' ') {
        let candidate = format!("{line}{word} ");
        if measure(&candidate) > region.width as f32 && !line.is_empty() {
            lines.push(PlacedLine {
                text: mem::take(&mut line),
                x,
                y: baseline(lines.len()),
            });
            line = format!("{word} ");
        } else {
            line = candidate;
        }
    }
    let last = line.trim();
    if !last.is_empty() {
        lines.push(PlacedLine {
            text: last.to_string(),
            x,
            y: baseline(lines.len()),
        });
    }
    lines
}

/// Draw `text` into `region` on `surface`.
pub fn composite<S>(surface: &mut S, region: &TextRegion, text: &str)
where
    S: TextSurface + ?Sized,
{
    surface.set_text_state(text_state(region));
    let lines = layout(region, text, |candidate| surface.measure_text(candidate));
    debug!(region = %region.id, lines = lines.len(), "compositing region");
    for line in lines {
        surface.fill_text(&line.text, line.x, line.y);
    }
}

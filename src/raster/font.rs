//! Font lookup, measurement and glyph drawing.
//!
//! Outline faces are loaded from `.ttf`/`.otf` files, shaped with `rustybuzz`
//! run by run in bidi display order and rasterized with `ab_glyph`. When a
//! region's family cannot be resolved the configured default family is used,
//! and failing that a built-in 5x7 bitmap face that needs no font files.

use std::collections::BTreeMap;
use std::fs;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{Blend, Canvas, draw_filled_rect_mut};
use imageproc::rect::Rect;
use rustybuzz::UnicodeBuffer;
use tracing::{debug, warn};

use crate::error::{CardError, Result};
use crate::raster::bidi::{visual_order, visual_runs};
use crate::template::Direction;

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;
/// Bitmap cells per em: the 7-row glyph covers 0.7 of the font size.
const CELLS_PER_EM: f32 = 10.0;
const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

/// An installed outline face.
#[derive(Clone)]
pub struct LoadedFont {
    family: String,
    font: FontArc,
    data: Arc<Vec<u8>>,
}

/// Collection of outline faces, looked up case-insensitively by family.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: BTreeMap<String, LoadedFont>,
    default_family: Option<String>,
}

/// The face chosen for a family list.
#[derive(Clone, Copy)]
pub enum Face<'a> {
    Outline(&'a LoadedFont),
    Builtin,
}

/// Size, color and paragraph direction of one line of text.
#[derive(Debug, Clone, Copy)]
pub struct LineStyle {
    pub px: f32,
    pub color: Rgba<u8>,
    pub direction: Direction,
}

struct ShapedGlyph {
    id: GlyphId,
    x: f32,
    y: f32,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face from raw font bytes under `family`.
    pub fn add_font(&mut self, family: &str, bytes: Vec<u8>) -> Result<()> {
        let family = family.trim();
        let font = FontArc::try_from_vec(bytes.clone())
            .map_err(|err| CardError::Validation(format!("invalid font data for {family}: {err}")))?;
        if rustybuzz::Face::from_slice(&bytes, 0).is_none() {
            return Err(CardError::Validation(format!("font {family} cannot be shaped")));
        }
        self.faces.insert(
            family.to_lowercase(),
            LoadedFont {
                family: family.to_string(),
                font,
                data: Arc::new(bytes),
            },
        );
        Ok(())
    }

    /// Load a single `.ttf`/`.otf` file; the family is the file stem.
    pub fn load_file(&mut self, path: &Path) -> Result<String> {
        let family = font_family_for(path)?;
        let bytes = fs::read(path)?;
        self.add_font(&family, bytes)?;
        debug!(family, path = %path.display(), "font loaded");
        Ok(family)
    }

    /// Load every font file in `dir`. Unreadable faces are skipped with a
    /// warning so one broken file does not hide the rest.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut loaded = 0;
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| has_font_extension(p))
            .collect();
        paths.sort();
        for path in paths {
            match self.load_file(&path) {
                Ok(_) => loaded += 1,
                Err(err) => warn!(path = %path.display(), %err, "skipping font"),
            }
        }
        Ok(loaded)
    }

    pub fn set_default_family(&mut self, family: Option<String>) {
        self.default_family = family.map(|f| f.trim().to_lowercase());
    }

    /// Installed family names as they were registered.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.faces.values().map(|f| f.family.as_str())
    }

    /// Pick the first available family from a CSS-style list such as
    /// `"Amiri", Arial, serif`.
    pub fn resolve(&self, family_list: &str) -> Face<'_> {
        for candidate in family_list.split(',') {
            let name = candidate.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase();
            if let Some(font) = self.faces.get(&name) {
                return Face::Outline(font);
            }
        }
        if let Some(font) = self.default_family.as_ref().and_then(|f| self.faces.get(f)) {
            return Face::Outline(font);
        }
        debug!(family_list, "family not available, using built-in face");
        Face::Builtin
    }
}

/// Family name for an uploaded font file, rejecting non-font extensions.
pub fn font_family_for(path: &Path) -> Result<String> {
    if !has_font_extension(path) {
        return Err(CardError::unsupported(path, "a .ttf or .otf font"));
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CardError::unsupported(path, "a named font file"))
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FONT_EXTENSIONS.iter().any(|f| e.eq_ignore_ascii_case(f)))
}

impl LoadedFont {
    pub fn family(&self) -> &str {
        &self.family
    }

    fn units_per_em(&self) -> f32 {
        self.font.units_per_em().unwrap_or(1000.0)
    }

    /// `ab_glyph` scale at which one em spans `px` pixels.
    fn scale(&self, px: f32) -> PxScale {
        PxScale::from(px * self.font.height_unscaled() / self.units_per_em())
    }

    /// Shape `text` into glyphs positioned relative to the pen origin, and
    /// return them with the total advance.
    fn shape(&self, text: &str, px: f32, direction: Direction) -> (Vec<ShapedGlyph>, f32) {
        let Some(face) = rustybuzz::Face::from_slice(&self.data, 0) else {
            return (Vec::new(), 0.0);
        };
        let k = px / self.units_per_em();
        let mut glyphs = Vec::new();
        let mut pen = 0.0;
        for run in visual_runs(text, direction) {
            let mut buffer = UnicodeBuffer::new();
            buffer.push_str(&run.text);
            buffer.set_direction(if run.rtl {
                rustybuzz::Direction::RightToLeft
            } else {
                rustybuzz::Direction::LeftToRight
            });
            buffer.guess_segment_properties();
            let shaped = rustybuzz::shape(&face, &[], buffer);
            for (info, pos) in shaped.glyph_infos().iter().zip(shaped.glyph_positions()) {
                glyphs.push(ShapedGlyph {
                    id: GlyphId(info.glyph_id as u16),
                    x: pen + pos.x_offset as f32 * k,
                    y: -(pos.y_offset as f32) * k,
                });
                pen += pos.x_advance as f32 * k;
            }
        }
        (glyphs, pen)
    }
}

impl Face<'_> {
    /// Advance width of `text` at `px` pixels.
    pub fn measure(&self, text: &str, px: f32, direction: Direction) -> f32 {
        match self {
            Face::Outline(font) => font.shape(text, px, direction).1,
            Face::Builtin => text.chars().count() as f32 * builtin_advance(px),
        }
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self, px: f32) -> f32 {
        match self {
            Face::Outline(font) => font.font.as_scaled(font.scale(px)).ascent(),
            Face::Builtin => GLYPH_HEIGHT as f32 * px / CELLS_PER_EM,
        }
    }

    /// Draw `text` (logical order) with its left edge at `x` and its
    /// baseline at `baseline`, blending over what is already on `canvas`.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, style: LineStyle) {
        let mut target = Blend(mem::take(canvas));
        match self {
            Face::Outline(font) => {
                let scale = font.scale(style.px);
                let (glyphs, _) = font.shape(text, style.px, style.direction);
                for glyph in glyphs {
                    let positioned = glyph
                        .id
                        .with_scale_and_position(scale, point(x + glyph.x, baseline + glyph.y));
                    if let Some(outlined) = font.font.outline_glyph(positioned) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, coverage| {
                            let px = bounds.min.x as i32 + gx as i32;
                            let py = bounds.min.y as i32 + gy as i32;
                            put_pixel(&mut target, px, py, style.color, coverage);
                        });
                    }
                }
            }
            Face::Builtin => {
                let cell = style.px / CELLS_PER_EM;
                let top = baseline - self.ascent(style.px);
                let visual = visual_order(text, style.direction);
                for (idx, ch) in visual.chars().enumerate() {
                    let glyph_x = x + idx as f32 * builtin_advance(style.px);
                    draw_glyph(&mut target, glyph_x, top, cell, ch, style.color);
                }
            }
        }
        *canvas = target.0;
    }
}

fn put_pixel(target: &mut Blend<RgbaImage>, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    let (w, h) = target.dimensions();
    if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
        return;
    }
    let mut color = color;
    color.0[3] = (f32::from(color.0[3]) * coverage.clamp(0.0, 1.0)).round() as u8;
    if color.0[3] > 0 {
        target.draw_pixel(x as u32, y as u32, color);
    }
}

fn builtin_advance(px: f32) -> f32 {
    (GLYPH_WIDTH + 1) as f32 * px / CELLS_PER_EM
}

fn draw_glyph(target: &mut Blend<RgbaImage>, x: f32, y: f32, cell: f32, ch: char, color: Rgba<u8>) {
    let pattern = glyph_pattern(ch);
    for (row, bits) in pattern.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                let x0 = x + col as f32 * cell;
                let y0 = y + row as f32 * cell;
                fill_cell(target, x0, y0, x0 + cell, y0 + cell, color);
            }
        }
    }
}

fn fill_cell(target: &mut Blend<RgbaImage>, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
    let left = x0.round() as i32;
    let top = y0.round() as i32;
    // Keep at least one pixel so small sizes stay visible.
    let width = (x1.round() as i32 - left).max(1) as u32;
    let height = (y1.round() as i32 - top).max(1) as u32;
    draw_filled_rect_mut(target, Rect::at(left, top).of_size(width, height), color);
}

#[rustfmt::skip]
fn glyph_pattern(ch: char) -> [u8; GLYPH_HEIGHT] {
    match ch.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b10010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b01010, 0b01010, 0b00100, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '&' => [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101],
        '/' => [0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000, 0b00000],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '#' => [0b01010, 0b11111, 0b01010, 0b01010, 0b11111, 0b01010, 0b01010],
        '@' => [0b01110, 0b10001, 0b10111, 0b10101, 0b10111, 0b10000, 0b01110],
        '\'' => [0b00100, 0b00100, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '=' => [0b00000, 0b11111, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000],
        '"' => [0b01010, 0b01010, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00100, 0b01000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '[' => [0b01110, 0b01000, 0b01000, 0b01000, 0b01000, 0b01000, 0b01110],
        ']' => [0b01110, 0b00010, 0b00010, 0b00010, 0b00010, 0b00010, 0b01110],
        '+' => [0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00010, 0b00100, 0b00100, 0b00000, 0b00100],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111, 0b00000],
        ';' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00110, 0b00100, 0b01000],
        '*' => [0b00100, 0b10101, 0b01110, 0b10101, 0b00100, 0b00000, 0b00000],
        ' ' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        // Anything outside the table draws as an outlined box.
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DEJAVU: &[u8] = include_bytes!("../../tests/fixtures/DejaVuSans.ttf");

    fn red(px: f32, direction: Direction) -> LineStyle {
        LineStyle {
            px,
            color: Rgba([255, 0, 0, 255]),
            direction,
        }
    }

    fn ink(canvas: &RgbaImage) -> Vec<(u32, u32)> {
        canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    fn dejavu_book() -> FontBook {
        let mut book = FontBook::new();
        book.add_font("DejaVu Sans", DEJAVU.to_vec()).unwrap();
        book
    }

    #[test]
    fn builtin_measures_six_tenths_em_per_char() {
        let book = FontBook::new();
        let face = book.resolve("Arial");
        assert!(matches!(face, Face::Builtin));
        assert_eq!(face.measure("Alice", 20.0, Direction::Ltr), 60.0);
        assert_eq!(face.measure("", 20.0, Direction::Ltr), 0.0);
    }

    #[test]
    fn builtin_draws_inside_expected_box() {
        let mut canvas = RgbaImage::new(100, 40);
        Face::Builtin.draw(&mut canvas, "I", 10.0, 30.0, red(20.0, Direction::Ltr));
        let painted = ink(&canvas);
        assert!(!painted.is_empty());
        assert!(painted.iter().all(|&(x, y)| (10..20).contains(&x) && (16..30).contains(&y)));
    }

    #[test]
    fn builtin_blends_translucent_fill() {
        let mut canvas = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 255, 255]));
        let style = LineStyle {
            color: Rgba([255, 0, 0, 128]),
            ..red(20.0, Direction::Ltr)
        };
        Face::Builtin.draw(&mut canvas, "I", 0.0, 16.0, style);
        let pixel = canvas.get_pixel(4, 10);
        assert!(pixel.0[0] > 0 && pixel.0[2] > 0, "expected a blend, got {pixel:?}");
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut canvas = RgbaImage::new(10, 10);
        Face::Builtin.draw(&mut canvas, "HELLO", -50.0, 200.0, red(40.0, Direction::Ltr));
        assert!(canvas.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let mut book = FontBook::new();
        assert!(matches!(
            book.add_font("Broken", vec![0, 1, 2, 3]),
            Err(CardError::Validation(_))
        ));
    }

    #[test]
    fn font_upload_requires_font_extension() {
        assert_eq!(font_family_for(Path::new("/tmp/Amiri.ttf")).unwrap(), "Amiri");
        assert_eq!(font_family_for(Path::new("Lato.OTF")).unwrap(), "Lato");
        assert!(matches!(
            font_family_for(Path::new("names.csv")),
            Err(CardError::UnsupportedFile { .. })
        ));
    }

    #[test]
    fn families_keep_their_registered_spelling() {
        let book = dejavu_book();
        assert_eq!(book.families().collect::<Vec<_>>(), vec!["DejaVu Sans"]);
        assert!(matches!(book.resolve("'dejavu sans', serif"), Face::Outline(_)));
    }

    #[test]
    fn outline_face_measures_and_draws_on_the_baseline() {
        let book = dejavu_book();
        let face = book.resolve("DejaVu Sans");
        let Face::Outline(font) = face else {
            panic!("expected the outline face");
        };
        assert_eq!(font.family(), "DejaVu Sans");

        let width = face.measure("Hello", 40.0, Direction::Ltr);
        assert!(width > 40.0 && width < 200.0, "width {width}");
        assert!(face.measure("Hello world", 40.0, Direction::Ltr) > width);
        let ascent = face.ascent(40.0);
        assert!(ascent > 20.0 && ascent < 50.0, "ascent {ascent}");

        let mut canvas = RgbaImage::new(300, 100);
        face.draw(&mut canvas, "Hello", 20.0, 70.0, red(40.0, Direction::Ltr));
        let painted = ink(&canvas);
        assert!(!painted.is_empty());
        let max_x = painted.iter().map(|p| p.0).max().unwrap();
        let max_y = painted.iter().map(|p| p.1).max().unwrap();
        let min_y = painted.iter().map(|p| p.1).min().unwrap();
        assert!(painted.iter().all(|p| p.0 >= 20));
        assert!(max_x as f32 <= 20.0 + width + 1.0);
        // "Hello" has no descenders: ink stays on or above the baseline.
        assert!(max_y <= 70 && min_y as f32 >= 70.0 - ascent - 1.0);
    }

    #[test]
    fn arabic_is_shaped_into_joined_forms() {
        let book = dejavu_book();
        let Face::Outline(font) = book.resolve("DejaVu Sans") else {
            panic!("expected the outline face");
        };
        // Visual order puts the first logical letter last in both runs.
        let (word, _) = font.shape("سمير", 30.0, Direction::Rtl);
        let (letter, _) = font.shape("س", 30.0, Direction::Rtl);
        assert!(word.len() >= 3);
        assert!(word.last().unwrap().id != letter[0].id);
    }
}

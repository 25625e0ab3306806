use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CardError, Result};

/// Literal token replaced by the recipient's name in region content.
pub const NAME_TOKEN: &str = "[name]";

/// Width given to templates created from an uploaded image.
pub const CANONICAL_WIDTH: u32 = 1080;

/// Horizontal alignment of text relative to its region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Base writing direction of a region's text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// One placeholder on the card: geometry, content template and style.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextRegion {
    pub id: String,
    pub content: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub font_family: String,
    pub font_size: u32,
    pub color: String,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default)]
    pub direction: Direction,
}

impl TextRegion {
    /// Region placed in the middle of a card of the given size, holding a
    /// single `[name]` placeholder.
    pub fn centered_on(image_width: u32, image_height: u32) -> Self {
        Self {
            id: format!("text_{}", uuid::Uuid::new_v4().simple()),
            content: NAME_TOKEN.to_string(),
            x: image_width as i32 / 2 - 150,
            y: image_height as i32 / 2,
            width: 300,
            height: 50,
            font_family: "Arial".to_string(),
            font_size: 24,
            color: "#000000".to_string(),
            alignment: Alignment::Center,
            direction: Direction::Ltr,
        }
    }

    /// Content with every `[name]` token replaced.
    ///
    /// An empty `name` leaves the token in place.
    pub fn resolve(&self, name: &str) -> String {
        resolve_content(&self.content, name)
    }

    /// Report the first broken invariant, if any.
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(CardError::Validation(format!(
                "region {} must have a positive size (got {}x{})",
                self.id, self.width, self.height
            )));
        }
        if self.font_size == 0 {
            return Err(CardError::Validation(format!(
                "region {} must have a positive font size",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Replace every occurrence of [`NAME_TOKEN`] in `content` with `name`.
pub fn resolve_content(content: &str, name: &str) -> String {
    if name.is_empty() {
        return content.to_string();
    }
    content.replace(NAME_TOKEN, name)
}

/// A background image plus an ordered list of text regions.
///
/// Regions paint in order; later regions cover earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardTemplate {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub text_areas: Vec<TextRegion>,
}

impl CardTemplate {
    /// Start a template with a fresh id and no regions.
    pub fn new(name: impl Into<String>, image_url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: generate_template_id(),
            name: name.into(),
            image_url: image_url.into(),
            image_width: width,
            image_height: height,
            text_areas: Vec::new(),
        }
    }

    /// Check the fields required at save time and every region.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.image_url.trim().is_empty() {
            return Err(CardError::Validation("template must have a background image".into()));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(CardError::Validation(format!(
                "template image size must be positive (got {}x{})",
                self.image_width, self.image_height
            )));
        }
        for region in &self.text_areas {
            region.validate()?;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Append a default region and return its id.
    pub fn add_region(&mut self) -> String {
        let region = TextRegion::centered_on(self.image_width, self.image_height);
        let id = region.id.clone();
        self.text_areas.push(region);
        id
    }

    pub fn region(&self, id: &str) -> Option<&TextRegion> {
        self.text_areas.iter().find(|r| r.id == id)
    }

    /// Replace the region carrying the same id, keeping its paint position.
    pub fn update_region(&mut self, region: TextRegion) -> Result<()> {
        region.validate()?;
        let slot = self
            .text_areas
            .iter_mut()
            .find(|r| r.id == region.id)
            .ok_or_else(|| CardError::Validation(format!("no region with id {}", region.id)))?;
        *slot = region;
        Ok(())
    }

    pub fn remove_region(&mut self, id: &str) -> Result<TextRegion> {
        let idx = self
            .text_areas
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CardError::Validation(format!("no region with id {id}")))?;
        Ok(self.text_areas.remove(idx))
    }

    /// Public link under which this template can be personalized.
    pub fn share_link(&self, base_url: &str) -> String {
        format!("{}/card/{}", base_url.trim_end_matches('/'), self.id)
    }
}

/// Reject a blank template name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CardError::Validation("template name must not be empty".into()));
    }
    Ok(())
}

/// Render size for a background of `source_width x source_height` scaled to
/// `width`, keeping the aspect ratio.
pub fn canonical_size(source_width: u32, source_height: u32, width: u32) -> (u32, u32) {
    if source_width == 0 {
        return (width, 0);
    }
    let ratio = source_height as f64 / source_width as f64;
    (width, (width as f64 * ratio).round() as u32)
}

fn generate_template_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Left => write!(f, "left"),
            Alignment::Center => write!(f, "center"),
            Alignment::Right => write!(f, "right"),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ltr => write!(f, "ltr"),
            Direction::Rtl => write!(f, "rtl"),
        }
    }
}

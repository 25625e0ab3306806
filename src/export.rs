//! Turning a rendered surface into PNG bytes and files.

use std::fs;
use std::path::Path;

use image::ImageEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{CardError, Result};
use crate::raster::Surface;

/// Encode the surface as an 8-bit RGBA PNG with the strongest compression.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>> {
    let canvas = surface.canvas();
    if canvas.width() == 0 || canvas.height() == 0 {
        return Err(CardError::Encoding("surface has no pixels to encode".into()));
    }
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| CardError::Encoding(format!("PNG encoding failed: {e}")))?;
    Ok(bytes)
}

/// Encode the surface and write it to `path`.
pub fn export_single(surface: &Surface, path: &Path) -> Result<()> {
    let bytes = encode_png(surface)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "card exported");
    Ok(())
}

/// Default file name offered for a single personalized card.
pub fn single_file_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        "greeting_card.png".to_string()
    } else {
        format!("greeting_card_{name}.png")
    }
}

/// Hex SHA-256 of encoded output, used to compare renders.
pub fn digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

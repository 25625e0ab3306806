//! Fetching and decoding background images.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{CardError, Result};

/// Source of decoded background bitmaps.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Fetch and decode `source`, failing with [`CardError::ImageLoad`].
    async fn load(&self, source: &str) -> Result<Arc<DynamicImage>>;
}

/// Loads `http(s)://` URLs, base64 `data:` URLs, `file://` URLs and plain
/// filesystem paths.
///
/// The last decoded image is kept so a batch over one template decodes its
/// background once.
pub struct SourceLoader {
    http: reqwest::Client,
    timeout: Option<Duration>,
    last: Mutex<Option<(String, Arc<DynamicImage>)>>,
}

impl SourceLoader {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!("greetcard/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CardError::image_load("http client", e))?;
        Ok(Self {
            http,
            timeout,
            last: Mutex::new(None),
        })
    }

    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let response = self
                .http
                .get(source)
                .send()
                .await
                .map_err(|e| CardError::image_load(source, format!("download failed: {e}")))?;
            if !response.status().is_success() {
                return Err(CardError::image_load(source, format!("HTTP {}", response.status())));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| CardError::image_load(source, format!("failed to read body: {e}")))?;
            return Ok(bytes.to_vec());
        }
        if let Some(rest) = source.strip_prefix("data:") {
            return decode_data_url(rest);
        }
        if source.starts_with("blob:") {
            return Err(CardError::image_load(source, "unsupported URL scheme"));
        }
        let path = source.strip_prefix("file://").unwrap_or(source);
        tokio::fs::read(Path::new(path))
            .await
            .map_err(|e| CardError::image_load(source, e))
    }

    async fn fetch_and_decode(&self, source: &str) -> Result<DynamicImage> {
        let bytes = self.fetch(source).await?;
        image::load_from_memory(&bytes).map_err(|e| CardError::image_load(source, format!("decode failed: {e}")))
    }
}

#[async_trait]
impl ImageLoader for SourceLoader {
    async fn load(&self, source: &str) -> Result<Arc<DynamicImage>> {
        let mut last = self.last.lock().await;
        if let Some((cached, image)) = last.as_ref() {
            if cached == source {
                return Ok(Arc::clone(image));
            }
        }

        let decoded = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch_and_decode(source))
                .await
                .map_err(|_| CardError::image_load(source, format!("timed out after {limit:?}")))??,
            None => self.fetch_and_decode(source).await?,
        };
        debug!(source, width = decoded.width(), height = decoded.height(), "background decoded");
        let decoded = Arc::new(decoded);
        *last = Some((source.to_string(), Arc::clone(&decoded)));
        Ok(decoded)
    }
}

/// Payload of a `data:<mime>;base64,<payload>` URL (the part after `data:`).
fn decode_data_url(rest: &str) -> Result<Vec<u8>> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CardError::image_load("data:", "malformed data URL"))?;
    let label = format!("data:{meta}");
    if !meta.split(';').any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return Err(CardError::image_load(&label, "only base64 data URLs are supported"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| CardError::image_load(&label, format!("invalid base64 payload: {e}")))
}

/// Pixel size of a local background image, rejecting files that are not
/// images.
pub fn image_file_size(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|_| CardError::unsupported(path, "a PNG or JPEG image"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn loads_png_from_path_and_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        RgbaImage::from_pixel(3, 2, Rgba([9, 9, 9, 255])).save(&path).unwrap();

        let loader = SourceLoader::new(None).unwrap();
        let image = loader.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));

        let url = format!("file://{}", path.display());
        assert_eq!(loader.load(&url).await.unwrap().width(), 3);
    }

    #[tokio::test]
    async fn missing_or_corrupt_sources_fail_with_image_load() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("bad.png");
        std::fs::write(&corrupt, b"not an image").unwrap();

        let loader = SourceLoader::new(Some(Duration::from_secs(5))).unwrap();
        for source in [
            dir.path().join("missing.png").display().to_string(),
            corrupt.display().to_string(),
            "data:image/png;base64,AAAA".to_string(),
            "data:image/png;base64,not base64!".to_string(),
            "data:image/svg+xml,%3Csvg%3E".to_string(),
            "blob:https://cards.example/1234".to_string(),
        ] {
            assert!(matches!(
                loader.load(&source).await,
                Err(CardError::ImageLoad { .. })
            ));
        }
    }

    #[tokio::test]
    async fn loads_base64_data_url() {
        let mut png = Vec::new();
        RgbaImage::from_pixel(5, 4, Rgba([1, 2, 3, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&png));

        let loader = SourceLoader::new(None).unwrap();
        let image = loader.load(&url).await.unwrap();
        assert_eq!((image.width(), image.height()), (5, 4));
        assert_eq!(image.to_rgba8().get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn image_file_check_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("bg.png");
        RgbaImage::new(40, 30).save(&png).unwrap();
        assert_eq!(image_file_size(&png).unwrap(), (40, 30));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hello").unwrap();
        assert!(matches!(image_file_size(&text), Err(CardError::UnsupportedFile { .. })));
    }
}

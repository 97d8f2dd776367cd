//! Image fetching for export
//!
//! Every image or svg block URL is resolved against the asset base, fetched
//! once, and decoded far enough to know its format and pixel size. Anything
//! that cannot be fetched or decoded is simply absent from the store and
//! renders as a placeholder.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use image::{ImageFormat, ImageReader};

use crate::config::ExportConfig;
use crate::document::ParsedQuestion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// File extension matching the decoded format
    pub extension: &'static str,
}

impl FetchedImage {
    /// Decode enough of `bytes` to learn format and size; only formats Word
    /// renders inline are accepted
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let format = image::guess_format(&bytes).ok()?;
        let extension = match format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            _ => return None,
        };
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            bytes,
            width,
            height,
            extension,
        })
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension {
            "png" => "image/png",
            "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            _ => "image/bmp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AssetSource {
    Remote(String),
    Local(PathBuf),
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Where a block URL is read from: absolute URLs as-is, relative ones
/// joined to a remote base or looked up under a local base directory
fn resolve(url: &str, base: Option<&str>) -> AssetSource {
    if is_remote(url) {
        return AssetSource::Remote(url.to_string());
    }
    let relative = url.trim_start_matches('/');
    match base.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) if is_remote(base) => {
            AssetSource::Remote(format!("{}/{relative}", base.trim_end_matches('/')))
        }
        Some(base) => AssetSource::Local(PathBuf::from(base).join(relative)),
        None => AssetSource::Local(PathBuf::from(url)),
    }
}

/// Images by the URL written in their block
#[derive(Debug, Default)]
pub struct AssetStore {
    images: HashMap<String, FetchedImage>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&FetchedImage> {
        self.images.get(url.trim())
    }

    /// Add image bytes under `url`; returns `false` when they do not decode
    pub fn insert(&mut self, url: &str, bytes: Vec<u8>) -> bool {
        match FetchedImage::from_bytes(bytes) {
            Some(image) => {
                self.images.insert(url.trim().to_string(), image);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Fetch every image referenced by `questions`
    pub async fn fetch(
        questions: &[ParsedQuestion],
        asset_base_url: Option<&str>,
        config: &ExportConfig,
    ) -> Self {
        let mut store = Self::new();
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                log::warn!("HTTP client unavailable, remote images become placeholders: {e}");
                None
            }
        };

        let mut seen = std::collections::HashSet::new();
        for url in questions
            .iter()
            .flat_map(ParsedQuestion::blocks)
            .filter_map(|block| block.url())
            .map(str::trim)
            .filter(|url| !url.is_empty())
        {
            if !seen.insert(url.to_string()) {
                continue;
            }
            let bytes = match resolve(url, asset_base_url) {
                AssetSource::Remote(remote) => match &client {
                    Some(client) => download(client, &remote).await,
                    None => None,
                },
                AssetSource::Local(path) => match tokio::fs::read(&path).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        log::warn!("Could not read image {}: {e}", path.display());
                        None
                    }
                },
            };
            if let Some(bytes) = bytes {
                if !store.insert(url, bytes) {
                    log::warn!("Unsupported image format: {url}");
                }
            }
        }
        log::debug!("Fetched {}/{} images", store.len(), seen.len());
        store
    }
}

async fn download(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status());
    let bytes = match response {
        Ok(response) => response.bytes().await,
        Err(e) => Err(e),
    };
    match bytes {
        Ok(bytes) => Some(bytes.to_vec()),
        Err(e) => {
            log::warn!("Could not download {url}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContentBlock, QuestionType};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([0, 0, 0]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve("https://cdn.example.com/a.png", Some("/tmp/work")),
            AssetSource::Remote("https://cdn.example.com/a.png".into())
        );
        assert_eq!(
            resolve("doc-assets/a.png", Some("https://example.com/uploads/abc/")),
            AssetSource::Remote("https://example.com/uploads/abc/doc-assets/a.png".into())
        );
        assert_eq!(
            resolve("/doc-assets/a.png", Some("/tmp/work/")),
            AssetSource::Local(PathBuf::from("/tmp/work/doc-assets/a.png"))
        );
    }

    #[test]
    fn test_decoded_size_and_rejects_garbage() {
        let image = FetchedImage::from_bytes(png_bytes(30, 10)).unwrap();
        assert_eq!((image.width, image.height, image.extension), (30, 10, "png"));
        assert!(FetchedImage::from_bytes(b"not an image".to_vec()).is_none());
    }

    #[tokio::test]
    async fn test_fetch_from_local_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("doc-assets")).unwrap();
        std::fs::write(dir.path().join("doc-assets/a.png"), png_bytes(4, 2)).unwrap();

        let mut question = ParsedQuestion::new(1, QuestionType::Solution);
        question.question_body = vec![
            ContentBlock::image("doc-assets/a.png", None, None),
            ContentBlock::image("doc-assets/missing.png", None, None),
        ];
        let base = dir.path().to_string_lossy().into_owned();
        let store = AssetStore::fetch(&[question], Some(&base), &ExportConfig::default()).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("doc-assets/a.png").map(|i| i.width), Some(4));
        assert!(store.get("doc-assets/missing.png").is_none());
    }
}

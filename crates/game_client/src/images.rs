//! Image download and decode stage of a round.

use std::{fmt, io::Cursor, sync::Arc};

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use reqwest::{Client, StatusCode};
use shared::error::GameError;
use tracing::{debug, warn};
use url::Url;

use crate::transport_error;

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn download_image(&self, url: &str) -> Result<DecodedImage, GameError>;
}

/// A render-ready RGBA bitmap plus the url it came from.
#[derive(Clone)]
pub struct DecodedImage {
    source_url: Url,
    pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    pub fn decode(source_url: Url, bytes: &[u8]) -> Result<Self, GameError> {
        let decoded = image::load_from_memory(bytes).map_err(|err| {
            debug!(url = %source_url, "image bytes did not decode: {err}");
            GameError::InvalidImageData
        })?;
        Ok(Self {
            source_url,
            pixels: Arc::new(decoded.to_rgba8()),
        })
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn rgba(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn encode_png(&self) -> image::ImageResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("source_url", &self.source_url.as_str())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Only absolute http(s) urls can be requested.
///
/// The url parser silently strips surrounding whitespace and embedded tabs or
/// newlines; such input is rejected instead.
pub fn parse_image_url(raw: &str) -> Result<Url, GameError> {
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        warn!("image url contains whitespace or control characters");
        return Err(GameError::InvalidUrl);
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(url),
        Ok(url) => {
            warn!(scheme = url.scheme(), "refusing non-http image url");
            Err(GameError::InvalidUrl)
        }
        Err(err) => {
            warn!("malformed image url: {err}");
            Err(GameError::InvalidUrl)
        }
    }
}

pub struct HttpImageDownloader {
    http: Client,
}

impl HttpImageDownloader {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageSource for HttpImageDownloader {
    async fn download_image(&self, url: &str) -> Result<DecodedImage, GameError> {
        let url = parse_image_url(url)?;

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), url = %url, "image download rejected");
            return Err(GameError::BadStatus(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        debug!(url = %url, len = bytes.len(), "downloaded image bytes");

        tokio::task::spawn_blocking(move || DecodedImage::decode(url, &bytes))
            .await
            .map_err(|err| {
                warn!("image decode task failed: {err}");
                GameError::InvalidImageData
            })?
    }
}

#[cfg(test)]
#[path = "tests/images_tests.rs"]
mod tests;

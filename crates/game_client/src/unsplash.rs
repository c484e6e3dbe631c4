//! Random-photo metadata stage of a round.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use shared::{domain::ImageMetadata, error::GameError, protocol::RandomImageResponse};
use tracing::{debug, warn};

use crate::{config::Settings, transport_error};

const ACCEPT_VERSION_HEADER: &str = "Accept-Version";
const ACCEPT_VERSION: &str = "v1";

#[async_trait]
pub trait RandomImageSource: Send + Sync {
    async fn fetch_random_image_metadata(&self) -> Result<ImageMetadata, GameError>;
}

pub struct UnsplashClient {
    http: Client,
    api_base_url: String,
    access_token: String,
}

impl UnsplashClient {
    pub fn new(http: Client, settings: &Settings) -> Self {
        Self {
            http,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            access_token: settings.access_token.clone(),
        }
    }

    fn random_photo_url(&self) -> String {
        format!("{}/photos/random/", self.api_base_url)
    }
}

#[async_trait]
impl RandomImageSource for UnsplashClient {
    async fn fetch_random_image_metadata(&self) -> Result<ImageMetadata, GameError> {
        let response = self
            .http
            .get(self.random_photo_url())
            .query(&[("client_id", self.access_token.as_str())])
            .header(ACCEPT_VERSION_HEADER, ACCEPT_VERSION)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "random photo request rejected");
            return Err(GameError::BadStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let parsed: RandomImageResponse = serde_json::from_slice(&body).map_err(|err| {
            warn!("random photo payload did not match schema: {err}");
            GameError::DecodingFailed
        })?;

        debug!(photo_id = %parsed.id, "fetched random photo metadata");
        Ok(parsed.into())
    }
}

#[cfg(test)]
#[path = "tests/unsplash_tests.rs"]
mod tests;

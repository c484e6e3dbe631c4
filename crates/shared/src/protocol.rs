use serde::{Deserialize, Serialize};

use crate::domain::{ImageMetadata, PhotoId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrls {
    pub raw: Option<String>,
    pub full: Option<String>,
    pub regular: String,
    pub small: Option<String>,
    pub thumb: Option<String>,
}

/// Body of `GET /photos/random/`. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomImageResponse {
    #[serde(default)]
    pub id: PhotoId,
    #[serde(default)]
    pub alt_description: Option<String>,
    pub urls: ImageUrls,
}

impl From<RandomImageResponse> for ImageMetadata {
    fn from(value: RandomImageResponse) -> Self {
        Self {
            id: value.id,
            image_url: value.urls.regular,
            description: value.alt_description,
        }
    }
}

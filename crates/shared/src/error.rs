use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy shared by every network stage of a round.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GameError {
    #[error("invalid image url")]
    InvalidUrl,
    #[error("unexpected http status {0}")]
    BadStatus(u16),
    #[error("payload is not a supported image format")]
    InvalidImageData,
    #[error("response body did not match the expected schema")]
    DecodingFailed,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GameError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::BadStatus(_) => "bad_status",
            Self::InvalidImageData => "invalid_image_data",
            Self::DecodingFailed => "decoding_failed",
            Self::Transport(_) => "transport",
        }
    }
}

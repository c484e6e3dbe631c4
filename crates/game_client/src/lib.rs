//! Image acquisition pipeline and game rules for Find or Lose.

pub mod config;
pub mod game;
pub mod images;
pub mod round;
pub mod unsplash;

pub use config::{load_settings, ConfigError, Settings};
pub use game::{GameSession, GameState, GuessOutcome, TileLayout, TileSlot};
pub use images::{DecodedImage, HttpImageDownloader, ImageSource};
pub use round::{
    RoundEvent, RoundId, RoundObserver, RoundOrchestrator, RoundOutcome, RoundResult, RoundState,
};
pub use unsplash::{RandomImageSource, UnsplashClient};

/// Builds the HTTP client shared by the metadata and image stages.
///
/// reqwest keeps no response cache, so every request reaches the network.
pub fn build_http_client(settings: &Settings) -> Result<reqwest::Client, GameClientError> {
    reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .user_agent(concat!("find_or_lose/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| GameClientError::HttpClient(err.to_string()))
}

/// Normalizes a reqwest failure into the shared taxonomy.
///
/// The request url is stripped first since it carries the access token.
pub(crate) fn transport_error(err: reqwest::Error) -> shared::error::GameError {
    let err = err.without_url();
    tracing::warn!(
        timeout = err.is_timeout(),
        connect = err.is_connect(),
        "transport failure: {err}"
    );
    shared::error::GameError::transport(err.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum GameClientError {
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

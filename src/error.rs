use thiserror::Error;

use crate::render::Surface;

/// Errors raised by the view core. None of these are fatal: callers log them
/// and keep the current (possibly degraded) view interactive.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViewError {
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("failed to load asset {url}: {reason}")]
    AssetLoadFailure { url: String, reason: String },

    #[error("{0} renderer is not initialized")]
    RendererNotInitialized(Surface),

    #[error("{container} container is already held by the {holder} renderer")]
    ContainerBusy { container: Surface, holder: Surface },
}

/// Failures reported by the external collaborators (search, reverse geocoding, GPS).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("request was dropped before it resolved")]
    Cancelled,
}

impl From<simd_json::Error> for CollaboratorError {
    fn from(err: simd_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

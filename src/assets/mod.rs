//! Asynchronous imagery loading (globe textures, map tiles).
//!
//! Renderers never block on imagery. They tag each request with a
//! [`RequestToken`], poll their loader once per frame, and drop completions
//! whose token is no longer the one they are waiting for.

mod http;
#[cfg(test)]
mod manual;

use std::sync::Arc;

use crate::canvas::Rgb;
use crate::error::ViewError;

pub use http::HttpLoader;
#[cfg(test)]
pub(crate) use manual::{ManualLoader, ManualLoaderHandle};

/// Identifies one outstanding asset request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Hands out strictly increasing tokens.
#[derive(Debug, Default)]
pub struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub fn next_token(&mut self) -> RequestToken {
        self.next += 1;
        RequestToken(self.next)
    }
}

/// What an asset is used for; loaders may post-process accordingly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssetKind {
    /// Equirectangular globe texture, downsampled after decode
    Texture,
    /// 256px map tile
    Tile,
}

/// Decoded RGB image.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl RasterImage {
    /// Build from row-major pixels; `None` if the buffer does not match the size.
    pub fn new(width: usize, height: usize, pixels: Vec<Rgb>) -> Option<Self> {
        (width > 0 && height > 0 && pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-color image, handy as a stand-in texture.
    pub fn solid(width: usize, height: usize, rgb: Rgb) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels: vec![rgb; width.max(1) * height.max(1)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y.min(self.height - 1) * self.width + x.min(self.width - 1)]
    }

    /// Nearest-neighbour lookup. `u` wraps horizontally, `v` clamps.
    #[inline]
    pub fn sample(&self, u: f64, v: f64) -> Rgb {
        let x = (u.rem_euclid(1.0) * self.width as f64) as usize;
        let y = (v.clamp(0.0, 1.0) * self.height as f64) as usize;
        self.pixel(x, y)
    }
}

/// Result of one asset request.
#[derive(Debug, Clone)]
pub struct AssetCompletion {
    pub token: RequestToken,
    pub url: String,
    pub result: Result<Arc<RasterImage>, ViewError>,
}

/// Source of imagery. Implementations may complete requests in any order.
pub trait AssetLoader {
    fn request(&mut self, token: RequestToken, url: &str, kind: AssetKind);

    /// Drain whatever has completed since the last poll.
    fn poll(&mut self) -> Vec<AssetCompletion>;
}

/// Loader used when running offline: every request fails on the next poll,
/// so renderers stay on their placeholder imagery.
#[derive(Debug, Default)]
pub struct OfflineLoader {
    failed: Vec<AssetCompletion>,
}

impl AssetLoader for OfflineLoader {
    fn request(&mut self, token: RequestToken, url: &str, _kind: AssetKind) {
        self.failed.push(AssetCompletion {
            token,
            url: url.to_string(),
            result: Err(ViewError::AssetLoadFailure {
                url: url.to_string(),
                reason: "offline mode".to_string(),
            }),
        });
    }

    fn poll(&mut self) -> Vec<AssetCompletion> {
        std::mem::take(&mut self.failed)
    }
}

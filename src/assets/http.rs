use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use image::imageops::FilterType;

use super::{AssetCompletion, AssetKind, AssetLoader, RasterImage, RequestToken};
use crate::error::ViewError;

/// Globe textures are downsampled to this width; the rasterizer never needs more.
const TEXTURE_MAX_WIDTH: u32 = 1024;

/// Downloads imagery on short-lived worker threads and hands the decoded
/// results back through a channel drained by [`AssetLoader::poll`].
pub struct HttpLoader {
    client: reqwest::blocking::Client,
    tx: Sender<AssetCompletion>,
    rx: Receiver<AssetCompletion>,
}

impl HttpLoader {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(20))
            .build()?;
        let (tx, rx) = mpsc::channel();
        Ok(Self { client, tx, rx })
    }
}

impl AssetLoader for HttpLoader {
    fn request(&mut self, token: RequestToken, url: &str, kind: AssetKind) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let url = url.to_string();

        std::thread::spawn(move || {
            log::debug!("Downloading {url}");
            let result = fetch_image(&client, &url, kind).map_err(|reason| {
                ViewError::AssetLoadFailure {
                    url: url.clone(),
                    reason,
                }
            });
            // Receiver gone means the app is shutting down.
            let _ = tx.send(AssetCompletion { token, url, result });
        });
    }

    fn poll(&mut self) -> Vec<AssetCompletion> {
        self.rx.try_iter().collect()
    }
}

fn fetch_image(
    client: &reqwest::blocking::Client,
    url: &str,
    kind: AssetKind,
) -> Result<Arc<RasterImage>, String> {
    let response = client.get(url).send().map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let bytes = response.bytes().map_err(|e| e.to_string())?;
    let mut img = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;

    if kind == AssetKind::Texture && img.width() > TEXTURE_MAX_WIDTH {
        let height = (img.height() as u64 * TEXTURE_MAX_WIDTH as u64 / img.width() as u64) as u32;
        img = img.resize_exact(TEXTURE_MAX_WIDTH, height.max(1), FilterType::Triangle);
    }

    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let pixels = rgb.pixels().map(|p| p.0).collect();
    RasterImage::new(width, height, pixels)
        .map(Arc::new)
        .ok_or_else(|| "empty image".to_string())
}

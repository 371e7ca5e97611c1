use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::{AssetCompletion, AssetKind, AssetLoader, RasterImage, RequestToken};
use crate::error::ViewError;

#[derive(Debug, Default)]
struct ManualState {
    requests: Vec<(RequestToken, String, AssetKind)>,
    ready: Vec<AssetCompletion>,
}

/// Test loader: requests are recorded and only complete when the test says so,
/// in whatever order it chooses.
#[derive(Debug, Default)]
pub(crate) struct ManualLoader {
    state: Rc<RefCell<ManualState>>,
}

/// Test-side view of a [`ManualLoader`] that has been moved into a renderer.
#[derive(Debug, Clone)]
pub(crate) struct ManualLoaderHandle {
    state: Rc<RefCell<ManualState>>,
}

impl ManualLoader {
    pub(crate) fn new() -> (Self, ManualLoaderHandle) {
        let loader = Self::default();
        let handle = ManualLoaderHandle {
            state: Rc::clone(&loader.state),
        };
        (loader, handle)
    }
}

impl AssetLoader for ManualLoader {
    fn request(&mut self, token: RequestToken, url: &str, kind: AssetKind) {
        self.state
            .borrow_mut()
            .requests
            .push((token, url.to_string(), kind));
    }

    fn poll(&mut self) -> Vec<AssetCompletion> {
        std::mem::take(&mut self.state.borrow_mut().ready)
    }
}

impl ManualLoaderHandle {
    pub(crate) fn requests(&self) -> Vec<(RequestToken, String, AssetKind)> {
        self.state.borrow().requests.clone()
    }

    /// Most recent request whose URL contains `needle`.
    pub(crate) fn find(&self, needle: &str) -> Option<(RequestToken, String)> {
        self.state
            .borrow()
            .requests
            .iter()
            .rev()
            .find(|(_, url, _)| url.contains(needle))
            .map(|(token, url, _)| (*token, url.clone()))
    }

    pub(crate) fn complete(&self, token: RequestToken, url: &str, image: RasterImage) {
        self.state.borrow_mut().ready.push(AssetCompletion {
            token,
            url: url.to_string(),
            result: Ok(Arc::new(image)),
        });
    }

    pub(crate) fn fail(&self, token: RequestToken, url: &str) {
        self.state.borrow_mut().ready.push(AssetCompletion {
            token,
            url: url.to_string(),
            result: Err(ViewError::AssetLoadFailure {
                url: url.to_string(),
                reason: "test failure".to_string(),
            }),
        });
    }

    /// Complete every recorded request with a solid image of `rgb`.
    pub(crate) fn complete_all(&self, rgb: [u8; 3]) {
        let requests = std::mem::take(&mut self.state.borrow_mut().requests);
        for (token, url, _) in requests {
            self.complete(token, &url, RasterImage::solid(4, 4, rgb));
        }
    }
}

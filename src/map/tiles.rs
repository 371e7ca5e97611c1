use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::assets::{AssetCompletion, AssetKind, AssetLoader, RasterImage, RequestToken, TokenSource};
use crate::geo::MERCATOR_HALF_EXTENT;
use crate::style::ViewStyle;

use super::view::MapView;

/// Cached tiles beyond this are evicted, oldest zoom levels first.
const MAX_CACHED_TILES: usize = 384;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Tile containing a point in meters, plus the fractional position
    /// inside it (0..1 from the top-left corner).
    pub fn at(x_m: f64, y_m: f64, zoom: u8) -> Option<(Self, f64, f64)> {
        let n = 2f64.powi(zoom as i32);
        let world = 2.0 * MERCATOR_HALF_EXTENT;
        let tx = (x_m + MERCATOR_HALF_EXTENT) / world * n;
        let ty = (MERCATOR_HALF_EXTENT - y_m) / world * n;
        if !(0.0..n).contains(&ty) {
            return None;
        }
        let tx = tx.rem_euclid(n);
        Some((
            Self::new(tx as u32, ty as u32, zoom),
            tx.fract(),
            ty.fract(),
        ))
    }

    pub fn url(&self, style: ViewStyle) -> String {
        style.assets().tile_url(self.zoom, self.x, self.y)
    }
}

/// Tile zoom for a view: rounded view zoom, capped by the source.
pub fn tile_zoom(view_zoom: f64, max_zoom: u8) -> u8 {
    (view_zoom.round().max(0.0) as u8).min(max_zoom)
}

/// Every tile touched by the view at `zoom`, wrapped horizontally.
pub fn visible_tiles(view: &MapView, zoom: u8) -> Vec<TileCoord> {
    let corners = [
        view.unproject(0.0, 0.0),
        view.unproject(view.width.saturating_sub(1) as f64, view.height.saturating_sub(1) as f64),
    ];
    let n = 1i64 << zoom;
    let world = 2.0 * MERCATOR_HALF_EXTENT;
    let to_tile = |v: f64| (v / world * n as f64).floor() as i64;

    // Unwrapped x range, measured from the view's left edge.
    let res = view.resolution();
    let left = view.center.x - view.width as f64 / 2.0 * res + MERCATOR_HALF_EXTENT;
    let right = view.center.x + view.width as f64 / 2.0 * res + MERCATOR_HALF_EXTENT;
    let x0 = to_tile(left);
    let x1 = to_tile(right).min(x0 + n - 1);

    let y0 = to_tile(MERCATOR_HALF_EXTENT - corners[0].y).clamp(0, n - 1);
    let y1 = to_tile(MERCATOR_HALF_EXTENT - corners[1].y).clamp(0, n - 1);

    let mut tiles = Vec::new();
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let wrapped = tx.rem_euclid(n);
            tiles.push(TileCoord::new(wrapped as u32, ty as u32, zoom));
        }
    }
    tiles
}

#[derive(Debug, Clone)]
pub enum TileState {
    Loading,
    Ready(Arc<RasterImage>),
    Failed,
}

/// Base imagery for one style. Replacing the style replaces the whole
/// layer, so completions for the previous layer no longer match anything
/// in `pending` and are dropped.
#[derive(Debug)]
pub struct TileLayer {
    style: ViewStyle,
    tiles: HashMap<TileCoord, TileState>,
    pending: HashMap<RequestToken, TileCoord>,
}

impl TileLayer {
    pub fn new(style: ViewStyle) -> Self {
        Self {
            style,
            tiles: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn style(&self) -> ViewStyle {
        self.style
    }

    pub fn max_zoom(&self) -> u8 {
        self.style.assets().max_zoom
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&TileState> {
        self.tiles.get(coord)
    }

    pub fn ready_count(&self) -> usize {
        self.tiles
            .values()
            .filter(|s| matches!(s, TileState::Ready(_)))
            .count()
    }

    pub fn loading_count(&self) -> usize {
        self.pending.len()
    }

    /// Request every tile in `wanted` that is neither cached nor in flight.
    pub fn request_missing(
        &mut self,
        wanted: &[TileCoord],
        loader: &mut dyn AssetLoader,
        tokens: &mut TokenSource,
    ) {
        for coord in wanted {
            if self.tiles.contains_key(coord) {
                continue;
            }
            let token = tokens.next_token();
            loader.request(token, &coord.url(self.style), AssetKind::Tile);
            self.tiles.insert(*coord, TileState::Loading);
            self.pending.insert(token, *coord);
        }
        self.evict(wanted);
    }

    /// Store a completion; false when it does not belong to this layer.
    pub fn accept(&mut self, done: AssetCompletion) -> bool {
        let Some(coord) = self.pending.remove(&done.token) else {
            return false;
        };
        let state = match done.result {
            Ok(image) => TileState::Ready(image),
            Err(e) => {
                log::warn!("{e}");
                TileState::Failed
            }
        };
        self.tiles.insert(coord, state);
        true
    }

    /// Drop settled tiles outside `keep` until the cache fits again,
    /// other zoom levels first, then the ones farthest from the kept area.
    fn evict(&mut self, keep: &[TileCoord]) {
        let excess = self.tiles.len().saturating_sub(MAX_CACHED_TILES);
        if excess == 0 {
            return;
        }
        let Some(anchor) = keep.first() else {
            return;
        };
        let keep: HashSet<&TileCoord> = keep.iter().collect();
        let (cx, cy) = keep.iter().fold((0.0, 0.0), |(x, y), c| {
            (x + c.x as f64 + 0.5, y + c.y as f64 + 0.5)
        });
        let center = (cx / keep.len() as f64, cy / keep.len() as f64);

        let mut victims: Vec<(u8, f64, TileCoord)> = self
            .tiles
            .iter()
            .filter(|(coord, state)| {
                !matches!(state, TileState::Loading) && !keep.contains(coord)
            })
            .map(|(coord, _)| {
                (
                    coord.zoom.abs_diff(anchor.zoom),
                    distance_from(coord, center, anchor.zoom),
                    *coord,
                )
            })
            .collect();
        victims.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.total_cmp(&a.1)));
        for (_, _, coord) in victims.into_iter().take(excess) {
            self.tiles.remove(&coord);
        }
    }
}

/// Distance in tiles at `zoom` between the center of `coord` and `center`,
/// measured the short way around the antimeridian.
fn distance_from(coord: &TileCoord, center: (f64, f64), zoom: u8) -> f64 {
    let scale = 2f64.powi(zoom as i32 - coord.zoom as i32);
    let n = 2f64.powi(zoom as i32);
    let x = (coord.x as f64 + 0.5) * scale;
    let y = (coord.y as f64 + 0.5) * scale;
    let dx = (x - center.0).abs();
    dx.min(n - dx).hypot(y - center.1)
}

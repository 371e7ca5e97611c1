use glam::DVec2;

use crate::geo::{from_map_projection, to_map_projection, wrap_lon, MERCATOR_HALF_EXTENT};

pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 19.0;
pub const TILE_SIZE: f64 = 256.0;
/// Tile pixels covered by one canvas pixel. Terminal pixels are coarse, so
/// sampling every pixel of a tile would show a tiny patch of the world.
pub const TERMINAL_PIXEL_SPAN: f64 = 4.0;

/// Visible map area: center in EPSG:3857 meters, fractional zoom level,
/// canvas size in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: DVec2,
    pub zoom: f64,
    pub width: usize,
    pub height: usize,
}

impl MapView {
    pub fn new(center: DVec2, zoom: f64, width: usize, height: usize) -> Self {
        let mut view = Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        };
        view.normalize();
        view
    }

    /// View centered on (lat, lon).
    pub fn centered_on(lat: f64, lon: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self::new(to_map_projection(lat, lon), zoom, width, height)
    }

    /// Meters covered by one canvas pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        resolution_at(self.zoom)
    }

    /// Pixel position of a point given in meters (fractional, may be off-canvas).
    pub fn project(&self, p: DVec2) -> DVec2 {
        let res = self.resolution();
        let mut dx = p.x - self.center.x;
        // Pick the copy of the world nearest to the center.
        let world = 2.0 * MERCATOR_HALF_EXTENT;
        dx -= (dx / world).round() * world;
        DVec2::new(
            self.width as f64 / 2.0 + dx / res,
            self.height as f64 / 2.0 - (p.y - self.center.y) / res,
        )
    }

    /// Integer pixel for (lat, lon).
    pub fn project_latlon(&self, lat: f64, lon: f64) -> (i32, i32) {
        let p = self.project(to_map_projection(lat, lon));
        (p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Meters under canvas pixel (px, py), x wrapped into the world.
    pub fn unproject(&self, px: f64, py: f64) -> DVec2 {
        let res = self.resolution();
        let x = self.center.x + (px + 0.5 - self.width as f64 / 2.0) * res;
        let y = self.center.y - (py + 0.5 - self.height as f64 / 2.0) * res;
        DVec2::new(wrap_x(x), y)
    }

    /// (lat, lon) under canvas pixel (px, py).
    pub fn unproject_latlon(&self, px: f64, py: f64) -> (f64, f64) {
        let m = self.unproject(px, py);
        let (lat, lon) = from_map_projection(m.x, m.y);
        (lat, wrap_lon(lon))
    }

    /// Move the view so content follows a drag of (dx, dy) pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let res = self.resolution();
        self.center.x -= dx * res;
        self.center.y += dy * res;
        self.normalize();
    }

    /// Change zoom by `delta` keeping the point under (px, py) fixed.
    pub fn zoom_at(&mut self, px: f64, py: f64, delta: f64) {
        let anchor = self.unproject(px, py);
        let before = self.project(anchor);
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.project(anchor);
        self.pan(before.x - after.x, before.y - after.y);
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    fn normalize(&mut self) {
        self.center.x = wrap_x(self.center.x);
        self.center.y = self
            .center
            .y
            .clamp(-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT);
    }
}

/// Meters per canvas pixel at `zoom`.
pub fn resolution_at(zoom: f64) -> f64 {
    2.0 * MERCATOR_HALF_EXTENT / (TILE_SIZE * 2f64.powf(zoom)) * TERMINAL_PIXEL_SPAN
}

/// Wrap an x coordinate in meters into [-half extent, half extent).
/// Values already in range come back untouched.
pub fn wrap_x(x: f64) -> f64 {
    if (-MERCATOR_HALF_EXTENT..MERCATOR_HALF_EXTENT).contains(&x) {
        return x;
    }
    let world = 2.0 * MERCATOR_HALF_EXTENT;
    (x + MERCATOR_HALF_EXTENT).rem_euclid(world) - MERCATOR_HALF_EXTENT
}

/// Eased center/zoom animation, like a map view's `animate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAnimation {
    from: (DVec2, f64),
    to: (DVec2, f64),
    duration_s: f64,
    elapsed_s: f64,
}

impl ViewAnimation {
    pub fn new(view: &MapView, center: DVec2, zoom: f64, duration_s: f64) -> Self {
        // Travel the short way around the antimeridian.
        let world = 2.0 * MERCATOR_HALF_EXTENT;
        let mut target = center;
        let dx = target.x - view.center.x;
        target.x -= (dx / world).round() * world;
        Self {
            from: (view.center, view.zoom),
            to: (target, zoom.clamp(MIN_ZOOM, MAX_ZOOM)),
            duration_s,
            elapsed_s: 0.0,
        }
    }

    /// Advance and apply to `view`; returns true once finished.
    pub fn step(&mut self, view: &mut MapView, dt: f64) -> bool {
        self.elapsed_s += dt;
        let t = if self.duration_s <= 0.0 {
            1.0
        } else {
            (self.elapsed_s / self.duration_s).min(1.0)
        };
        let eased = t * t * (3.0 - 2.0 * t);
        view.center = self.from.0.lerp(self.to.0, eased);
        view.zoom = self.from.1 + (self.to.1 - self.from.1) * eased;
        view.normalize();
        t >= 1.0
    }
}

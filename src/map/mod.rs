//! Web Mercator tile map with a single draggable marker.

mod tiles;
mod view;

use std::rc::Rc;

use glam::DVec2;

use crate::assets::{AssetLoader, TokenSource};
use crate::canvas::{draw_pin, draw_polyline, shade, RasterCanvas, Rgb};
use crate::data::Outlines;
use crate::error::ViewError;
use crate::geo::{from_map_projection, to_map_projection, wrap_lon, MAX_MERCATOR_LAT};
use crate::location::Location;
use crate::render::{Container, ContainerLease, Frame, FrameHandle, FrameScheduler, Surface};
use crate::style::ViewStyle;

pub use tiles::{tile_zoom, visible_tiles, TileCoord, TileLayer, TileState};
pub use view::{
    resolution_at, wrap_x, MapView, ViewAnimation, MAX_ZOOM, MIN_ZOOM, TERMINAL_PIXEL_SPAN,
    TILE_SIZE,
};

pub const MARKER_RGB: Rgb = [255, 0, 0];
const OUTLINE_RGB: Rgb = [170, 200, 170];
const OFF_WORLD_RGB: Rgb = [12, 12, 16];
/// Placeholder base color is dimmed like an unlit map
const PLACEHOLDER_LIGHT: f64 = 0.8;
const WORLD_VIEW: (f64, f64) = (20.0, 0.0);

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The user chose a location by clicking or by dropping the marker.
    LocationPicked(Location),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    /// Zoom used when centering on a location
    pub focus_zoom: f64,
    pub recenter_duration_s: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            focus_zoom: 12.0,
            recenter_duration_s: 1.0,
        }
    }
}

/// The single marker feature of the vector layer, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFeature {
    pub position: DVec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Pan { last: (f64, f64), moved: bool },
    MarkerDrag,
}

struct MapScene {
    lease: ContainerLease,
    canvas: RasterCanvas,
    view: MapView,
    animation: Option<ViewAnimation>,
    base: TileLayer,
    /// Vector layer; holds zero or one marker
    features: Vec<MarkerFeature>,
    gesture: Option<Gesture>,
    frame: Option<FrameHandle>,
}

pub struct MapRenderer {
    loader: Box<dyn AssetLoader>,
    outlines: Rc<Outlines>,
    settings: MapSettings,
    tokens: TokenSource,
    scene: Option<MapScene>,
    events: Vec<MapEvent>,
}

impl MapRenderer {
    pub fn new(loader: Box<dyn AssetLoader>, outlines: Rc<Outlines>, settings: MapSettings) -> Self {
        Self {
            loader,
            outlines,
            settings,
            tokens: TokenSource::default(),
            scene: None,
            events: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.scene.is_some()
    }

    /// Attach to `container`, centered on `location` when there is one.
    pub fn initialize(
        &mut self,
        container: &Container,
        location: Option<&Location>,
        style: ViewStyle,
        scheduler: &mut FrameScheduler,
    ) -> Result<(), ViewError> {
        if self.scene.is_some() {
            log::debug!("Map already initialized");
            return Ok(());
        }

        let lease = container.acquire(Surface::Map)?;
        let (cols, rows) = lease.cells();
        let canvas = RasterCanvas::new(cols as usize, rows as usize);
        let view = match location {
            Some(loc) => MapView::centered_on(
                loc.latitude(),
                loc.longitude(),
                self.settings.focus_zoom,
                canvas.width(),
                canvas.height(),
            ),
            None => MapView::centered_on(
                WORLD_VIEW.0,
                WORLD_VIEW.1,
                MIN_ZOOM,
                canvas.width(),
                canvas.height(),
            ),
        };
        let features = location
            .map(|loc| MarkerFeature {
                position: to_map_projection(loc.latitude(), loc.longitude()),
            })
            .into_iter()
            .collect();

        self.scene = Some(MapScene {
            lease,
            canvas,
            view,
            animation: None,
            base: TileLayer::new(style),
            features,
            gesture: None,
            frame: Some(scheduler.request(Surface::Map)),
        });
        log::info!("Map initialized ({cols}x{rows} cells, {style})");
        Ok(())
    }

    fn scene_mut(&mut self) -> Result<&mut MapScene, ViewError> {
        self.scene
            .as_mut()
            .ok_or(ViewError::RendererNotInitialized(Surface::Map))
    }

    /// Replace the marker and optionally fly the view to it.
    pub fn set_location(&mut self, location: &Location, recenter: bool) -> Result<(), ViewError> {
        let settings = self.settings.clone();
        let scene = self.scene_mut()?;
        let position = to_map_projection(location.latitude(), location.longitude());
        scene.features.clear();
        scene.features.push(MarkerFeature { position });
        if recenter {
            scene.animation = Some(ViewAnimation::new(
                &scene.view,
                position,
                settings.focus_zoom,
                settings.recenter_duration_s,
            ));
        }
        Ok(())
    }

    /// Swap the base layer. Tiles still in flight for the old style are
    /// dropped when they arrive.
    pub fn set_style(&mut self, style: ViewStyle) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        if scene.base.style() != style {
            log::debug!("Map base layer {} -> {style}", scene.base.style());
            scene.base = TileLayer::new(style);
        }
        Ok(())
    }

    /// Pointer pressed at canvas pixel (px, py).
    pub fn pointer_down(&mut self, px: f64, py: f64) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        let on_marker = scene.features.first().is_some_and(|m| {
            let tip = scene.view.project(m.position);
            (px - tip.x.floor()).abs() <= 2.0 && (tip.y.floor() - py) >= -1.0 && (tip.y.floor() - py) <= 6.0
        });
        scene.gesture = Some(if on_marker {
            Gesture::MarkerDrag
        } else {
            Gesture::Pan {
                last: (px, py),
                moved: false,
            }
        });
        scene.animation = None;
        Ok(())
    }

    pub fn pointer_move(&mut self, px: f64, py: f64) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        match scene.gesture.as_mut() {
            Some(Gesture::MarkerDrag) => {
                let position = on_map_plane(scene.view.unproject(px, py));
                scene.features.clear();
                scene.features.push(MarkerFeature { position });
            }
            Some(Gesture::Pan { last, moved }) => {
                let (dx, dy) = (px - last.0, py - last.1);
                if dx != 0.0 || dy != 0.0 {
                    scene.view.pan(dx, dy);
                    *last = (px, py);
                    *moved = true;
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Pointer released. A click or a marker drop emits `LocationPicked`.
    pub fn pointer_up(&mut self, px: f64, py: f64) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        let picked = match scene.gesture.take() {
            Some(Gesture::MarkerDrag) => Some(scene.view.unproject(px, py)),
            Some(Gesture::Pan { moved: false, .. }) => Some(scene.view.unproject(px, py)),
            _ => None,
        };
        let Some(position) = picked.map(on_map_plane) else {
            return Ok(());
        };

        scene.features.clear();
        scene.features.push(MarkerFeature { position });
        let (lat, lon) = from_map_projection(position.x, position.y);
        match Location::new(lat, wrap_lon(lon)) {
            Ok(location) => self.events.push(MapEvent::LocationPicked(location)),
            Err(e) => log::debug!("Ignoring pick: {e}"),
        }
        Ok(())
    }

    /// Zoom by scroll steps around canvas pixel (px, py).
    pub fn scroll(&mut self, px: f64, py: f64, steps: i32) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        scene.animation = None;
        scene.view.zoom_at(px, py, steps as f64);
        Ok(())
    }

    /// Keyboard pan by (dx, dy) canvas pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        scene.animation = None;
        scene.view.pan(dx, dy);
        Ok(())
    }

    /// Keyboard zoom around the view center.
    pub fn zoom(&mut self, steps: i32) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        let (cx, cy) = (scene.view.width as f64 / 2.0, scene.view.height as f64 / 2.0);
        self.scroll(cx, cy, steps)
    }

    /// Run one frame if `handle` is this renderer's pending callback.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        frame: &Frame,
        scheduler: &mut FrameScheduler,
    ) -> bool {
        let completions = self.loader.poll();
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        for done in completions {
            let url = done.url.clone();
            if !scene.base.accept(done) {
                log::debug!("Discarding stale tile {url}");
            }
        }
        if scene.frame != Some(handle) {
            log::debug!("Ignoring stale map frame {handle:?}");
            return false;
        }

        if let Some(animation) = scene.animation.as_mut() {
            if animation.step(&mut scene.view, frame.dt_s) {
                scene.animation = None;
            }
        }

        let (cols, rows) = scene.lease.cells();
        scene.canvas.resize(cols as usize, rows as usize);
        scene.view.set_size(scene.canvas.width(), scene.canvas.height());

        let zoom = tile_zoom(scene.view.zoom, scene.base.max_zoom());
        let wanted = visible_tiles(&scene.view, zoom);
        scene
            .base
            .request_missing(&wanted, self.loader.as_mut(), &mut self.tokens);
        scene.render(&self.outlines, zoom);

        scene.frame = Some(scheduler.request(Surface::Map));
        true
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    /// Detach from the container and drop all map state. Idempotent.
    pub fn dispose(&mut self, scheduler: &mut FrameScheduler) {
        if let Some(scene) = self.scene.take() {
            if let Some(handle) = scene.frame {
                scheduler.cancel(handle);
            }
            log::info!("Map disposed");
        }
        self.events.clear();
    }

    pub fn canvas(&self) -> Option<&RasterCanvas> {
        self.scene.as_ref().map(|s| &s.canvas)
    }

    pub fn view(&self) -> Option<&MapView> {
        self.scene.as_ref().map(|s| &s.view)
    }

    pub fn markers(&self) -> &[MarkerFeature] {
        self.scene.as_ref().map_or(&[], |s| s.features.as_slice())
    }

    pub fn base_style(&self) -> Option<ViewStyle> {
        self.scene.as_ref().map(|s| s.base.style())
    }

    pub fn base_layer(&self) -> Option<&TileLayer> {
        self.scene.as_ref().map(|s| &s.base)
    }

    pub fn frame_handle(&self) -> Option<FrameHandle> {
        self.scene.as_ref().and_then(|s| s.frame)
    }

    pub fn is_animating(&self) -> bool {
        self.scene.as_ref().is_some_and(|s| s.animation.is_some())
    }

    /// (lat, lon) under a canvas pixel.
    pub fn pick(&self, px: f64, py: f64) -> Option<(f64, f64)> {
        self.scene.as_ref().map(|s| s.view.unproject_latlon(px, py))
    }
}

/// Pull a point beyond the projection's latitude limit back onto the
/// map plane, so a pick off the top or bottom edge lands on the edge.
fn on_map_plane(position: DVec2) -> DVec2 {
    let limit = to_map_projection(MAX_MERCATOR_LAT, 0.0).y;
    DVec2::new(position.x, position.y.clamp(-limit, limit))
}

impl MapScene {
    fn render(&mut self, outlines: &Outlines, zoom: u8) {
        let (w, h) = (self.canvas.width(), self.canvas.height());
        if w == 0 || h == 0 {
            return;
        }
        let placeholder = shade(self.base.style().assets().placeholder_rgb, PLACEHOLDER_LIGHT);
        self.canvas.fill(placeholder);

        let view = &self.view;
        let max_jump = (w as i32 / 2).max(4);
        for line in outlines.lines() {
            draw_polyline(&mut self.canvas, line, max_jump, OUTLINE_RGB, |lon, lat| {
                Some(view.project_latlon(lat, lon))
            });
        }

        for py in 0..h {
            let row = self.canvas.row_mut(py);
            for (px, out) in row.iter_mut().enumerate() {
                let m = view.unproject(px as f64, py as f64);
                match TileCoord::at(m.x, m.y, zoom) {
                    Some((coord, fx, fy)) => {
                        if let Some(TileState::Ready(image)) = self.base.get(&coord) {
                            *out = image.sample(fx, fy);
                        }
                    }
                    None => *out = OFF_WORLD_RGB,
                }
            }
        }

        for marker in &self.features {
            let tip = view.project(marker.position);
            draw_pin(
                &mut self.canvas,
                tip.x.floor() as i32,
                tip.y.floor() as i32,
                MARKER_RGB,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ManualLoader, ManualLoaderHandle, RasterImage};

    fn renderer() -> (MapRenderer, ManualLoaderHandle) {
        let (loader, handle) = ManualLoader::new();
        let renderer = MapRenderer::new(
            Box::new(loader),
            Rc::new(Outlines::simple_world()),
            MapSettings::default(),
        );
        (renderer, handle)
    }

    fn run_frames(map: &mut MapRenderer, sched: &mut FrameScheduler, n: usize, dt: f64) {
        for _ in 0..n {
            let (frame, due) = sched.begin_frame(dt);
            for (handle, _) in due {
                map.on_frame(handle, &frame, sched);
            }
        }
    }

    fn sydney() -> Location {
        Location::new(-33.8688, 151.2093).unwrap()
    }

    #[test]
    fn test_initialize_without_location_hides_marker() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();
        assert!(map.markers().is_empty());
        assert_eq!(map.view().unwrap().zoom, MIN_ZOOM);
        assert_eq!(sched.pending_for(Surface::Map), 1);
    }

    #[test]
    fn test_initialize_with_location_centers_and_marks() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, Some(&sydney()), ViewStyle::Satellite, &mut sched)
            .unwrap();
        assert_eq!(map.markers().len(), 1);
        let view = map.view().unwrap();
        assert_eq!(view.zoom, 12.0);
        assert!((view.center - to_map_projection(-33.8688, 151.2093)).length() < 1e-6);
    }

    #[test]
    fn test_set_location_keeps_single_marker() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();
        for (lat, lon) in [(51.5, -0.12), (40.7, -74.0), (35.68, 139.69)] {
            map.set_location(&Location::new(lat, lon).unwrap(), false)
                .unwrap();
            assert_eq!(map.markers().len(), 1);
            assert!((map.markers()[0].position - to_map_projection(lat, lon)).length() < 1e-6);
        }
        assert!(!map.is_animating());
    }

    #[test]
    fn test_recenter_animates_to_focus_zoom() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();
        map.set_location(&sydney(), true).unwrap();
        assert!(map.is_animating());
        run_frames(&mut map, &mut sched, 70, 1.0 / 60.0);
        assert!(!map.is_animating());
        let view = map.view().unwrap();
        assert_eq!(view.zoom, 12.0);
        assert!((view.center - to_map_projection(-33.8688, 151.2093)).length() < 1e-3);
    }

    #[test]
    fn test_click_picks_location() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();

        let expected = map.pick(10.0, 10.0).unwrap();
        map.pointer_down(10.0, 10.0).unwrap();
        map.pointer_up(10.0, 10.0).unwrap();

        let events = map.drain_events();
        assert_eq!(events.len(), 1);
        let MapEvent::LocationPicked(loc) = &events[0];
        assert!((loc.latitude() - expected.0).abs() < 1e-9);
        assert!((loc.longitude() - expected.1).abs() < 1e-9);
        assert_eq!(map.markers().len(), 1);
    }

    #[test]
    fn test_drag_on_empty_map_pans_without_pick() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();
        let before = map.view().unwrap().center;
        map.pointer_down(10.0, 10.0).unwrap();
        map.pointer_move(20.0, 12.0).unwrap();
        map.pointer_up(20.0, 12.0).unwrap();
        assert!(map.drain_events().is_empty());
        assert_ne!(map.view().unwrap().center, before);
        assert!(map.markers().is_empty());
    }

    #[test]
    fn test_marker_drag_moves_and_emits_on_release() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 40, 20);
        map.initialize(&container, Some(&sydney()), ViewStyle::Standard, &mut sched)
            .unwrap();
        let center = map.view().unwrap().center;
        let tip = map.view().unwrap().project(center);

        map.pointer_down(tip.x.floor(), tip.y.floor() - 3.0).unwrap();
        map.pointer_move(tip.x + 6.0, tip.y + 4.0).unwrap();
        assert_eq!(map.markers().len(), 1);
        assert!(map.drain_events().is_empty());
        assert_eq!(map.view().unwrap().center, center);

        map.pointer_up(tip.x + 6.0, tip.y + 4.0).unwrap();
        let events = map.drain_events();
        assert_eq!(events.len(), 1);
        let MapEvent::LocationPicked(loc) = &events[0];
        assert!(loc.longitude() > 151.2093);
        assert!(loc.latitude() < -33.8688);
    }

    #[test]
    fn test_style_swap_discards_old_tiles() {
        let (mut map, loader) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 20, 10);
        map.initialize(&container, Some(&sydney()), ViewStyle::Satellite, &mut sched)
            .unwrap();
        run_frames(&mut map, &mut sched, 1, 0.016);
        let old_requests = loader.requests();
        assert!(!old_requests.is_empty());

        map.set_style(ViewStyle::Night).unwrap();
        for (token, url, _) in old_requests {
            loader.complete(token, &url, RasterImage::solid(4, 4, [0, 255, 0]));
        }
        run_frames(&mut map, &mut sched, 1, 0.016);

        let layer = map.base_layer().unwrap();
        assert_eq!(layer.style(), ViewStyle::Night);
        assert_eq!(layer.ready_count(), 0);
        assert!(loader.find("VIIRS_CityLights").is_some());
        let canvas = map.canvas().unwrap();
        assert_eq!(canvas.count([0, 255, 0]), 0);
    }

    #[test]
    fn test_tiles_paint_canvas() {
        let (mut map, loader) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 20, 10);
        map.initialize(&container, Some(&sydney()), ViewStyle::Standard, &mut sched)
            .unwrap();
        run_frames(&mut map, &mut sched, 1, 0.016);
        loader.complete_all([0, 0, 200]);
        run_frames(&mut map, &mut sched, 1, 0.016);
        let canvas = map.canvas().unwrap();
        assert!(canvas.count([0, 0, 200]) > 0);
        assert!(canvas.count(MARKER_RGB) > 0);
    }

    #[test]
    fn test_disposed_map_rejects_calls_and_frames() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        map.dispose(&mut sched);
        assert_eq!(
            map.set_location(&sydney(), true),
            Err(ViewError::RendererNotInitialized(Surface::Map))
        );

        let container = Container::new(Surface::Map, 20, 10);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();
        let handle = map.frame_handle().unwrap();
        map.dispose(&mut sched);
        map.dispose(&mut sched);
        assert_eq!(sched.pending_for(Surface::Map), 0);
        assert_eq!(container.holder(), None);
        let (frame, _) = sched.begin_frame(0.016);
        assert!(!map.on_frame(handle, &frame, &mut sched));
    }

    #[test]
    fn test_click_beyond_world_edge_lands_on_edge() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 60, 30);
        map.initialize(&container, None, ViewStyle::Standard, &mut sched)
            .unwrap();
        // Push the north edge of the world well below the top of the canvas.
        map.pan(0.0, 400.0).unwrap();
        let limit = to_map_projection(MAX_MERCATOR_LAT, 0.0).y;
        assert!(map.view().unwrap().unproject(10.0, 2.0).y > limit);

        map.pointer_down(10.0, 2.0).unwrap();
        map.pointer_up(10.0, 2.0).unwrap();
        let events = map.drain_events();
        let MapEvent::LocationPicked(loc) = &events[0];
        assert!(loc.latitude() <= MAX_MERCATOR_LAT + 1e-9);

        // Echoing the picked location back leaves the marker where it was.
        let dropped = map.markers()[0].position;
        map.set_location(loc, false).unwrap();
        let echoed = map.markers()[0].position;
        assert!((dropped - echoed).length() < 1e-6);
    }

    #[test]
    fn test_marker_drag_stays_on_map_plane() {
        let (mut map, _) = renderer();
        let mut sched = FrameScheduler::new();
        let container = Container::new(Surface::Map, 60, 30);
        let north = Location::new(84.0, 10.0).unwrap();
        map.initialize(&container, Some(&north), ViewStyle::Standard, &mut sched)
            .unwrap();
        map.set_location(&north, false).unwrap();
        map.zoom(-10).unwrap();
        let tip = map.view().unwrap().project(map.markers()[0].position);

        map.pointer_down(tip.x.floor(), tip.y.floor() - 3.0).unwrap();
        map.pointer_move(tip.x, -50.0).unwrap();
        let limit = to_map_projection(MAX_MERCATOR_LAT, 0.0).y;
        assert!(map.markers()[0].position.y <= limit);
        map.pointer_up(tip.x, -50.0).unwrap();
        let events = map.drain_events();
        let MapEvent::LocationPicked(loc) = &events[0];
        assert!(loc.latitude() <= MAX_MERCATOR_LAT + 1e-9);
        assert!(loc.latitude() > 84.0);
    }
}

//! Textured, lit globe with an orbit camera, a star backdrop and one marker.
//!
//! The globe is ray-traced into a [`RasterCanvas`] every frame. All scene
//! state lives in a [`GlobeScene`] that exists only between `initialize` and
//! `dispose`.

mod camera;
mod spin;

use std::rc::Rc;
use std::sync::Arc;

use glam::{DMat3, DVec3};

use crate::assets::{AssetKind, AssetLoader, RasterImage, RequestToken, TokenSource};
use crate::canvas::{draw_pin, draw_polyline, shade, RasterCanvas, Rgb};
use crate::data::Outlines;
use crate::error::ViewError;
use crate::geo::{from_sphere_point, to_sphere_point};
use crate::location::Location;
use crate::render::{Container, ContainerLease, Frame, FrameHandle, FrameScheduler, Surface};
use crate::style::ViewStyle;

pub use camera::{OrbitCamera, OrbitControls, OrbitSettings, ViewBasis};
pub use spin::{shortest_angular_delta, yaw_facing, YawAnimation};

pub const GLOBE_RADIUS: f64 = 5.0;
/// Marker sits slightly above the surface so it is never z-fighting the texture
pub const MARKER_RADIUS: f64 = 5.1;
pub const CAMERA_DISTANCE: f64 = 15.0;
pub const FOV_DEG: f64 = 60.0;

const AMBIENT: f64 = 0.5;
const SUN_INTENSITY: f64 = 1.0;
const SUN_POSITION: DVec3 = DVec3::new(5.0, 3.0, 5.0);

const STAR_COUNT: u64 = 600;
const STAR_RADIUS: f64 = 200.0;
/// Star field drift (radians per second)
const STAR_DRIFT: f64 = 0.006;

const SPACE_RGB: Rgb = [0, 0, 0];
const OUTLINE_RGB: Rgb = [150, 190, 150];
pub const MARKER_RGB: Rgb = [255, 0, 0];

/// Notifications drained by the coordinator after each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobeEvent {
    RotationFinished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeSettings {
    pub orbit: OrbitSettings,
    pub rotate_duration_s: f64,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self {
            orbit: OrbitSettings::default(),
            rotate_duration_s: 1.0,
        }
    }
}

struct GlobeScene {
    lease: ContainerLease,
    canvas: RasterCanvas,
    controls: OrbitControls,
    /// Rotation of the globe mesh about +Y
    yaw: f64,
    spin: Option<YawAnimation>,
    texture: Option<(ViewStyle, Arc<RasterImage>)>,
    texture_request: Option<(RequestToken, ViewStyle)>,
    style: ViewStyle,
    /// Marker position in the globe's local frame; `None` while hidden
    marker: Option<DVec3>,
    stars: Vec<(DVec3, u8)>,
    star_spin: f64,
    frame: Option<FrameHandle>,
    visible: bool,
}

pub struct GlobeRenderer {
    loader: Box<dyn AssetLoader>,
    outlines: Rc<Outlines>,
    settings: GlobeSettings,
    tokens: TokenSource,
    scene: Option<GlobeScene>,
    events: Vec<GlobeEvent>,
}

impl GlobeRenderer {
    pub fn new(loader: Box<dyn AssetLoader>, outlines: Rc<Outlines>, settings: GlobeSettings) -> Self {
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

    /// Build the scene inside `container` and start the render loop.
    /// Calling it on a live renderer does nothing.
    pub fn initialize(
        &mut self,
        container: &Container,
        style: ViewStyle,
        scheduler: &mut FrameScheduler,
    ) -> Result<(), ViewError> {
        if self.scene.is_some() {
            log::debug!("Globe already initialized");
            return Ok(());
        }

        let lease = container.acquire(Surface::Globe)?;
        let (cols, rows) = lease.cells();
        let controls = OrbitControls::new(
            OrbitCamera::new(CAMERA_DISTANCE, FOV_DEG),
            self.settings.orbit.clone(),
        );

        let mut scene = GlobeScene {
            lease,
            canvas: RasterCanvas::new(cols as usize, rows as usize),
            controls,
            yaw: 0.0,
            spin: None,
            texture: None,
            texture_request: None,
            style,
            marker: None,
            stars: star_field(),
            star_spin: 0.0,
            frame: Some(scheduler.request(Surface::Globe)),
            visible: true,
        };
        let token = self.tokens.next_token();
        self.loader
            .request(token, style.assets().texture_url, AssetKind::Texture);
        scene.texture_request = Some((token, style));

        self.scene = Some(scene);
        log::info!("Globe initialized ({cols}x{rows} cells, {style})");
        Ok(())
    }

    fn scene_mut(&mut self) -> Result<&mut GlobeScene, ViewError> {
        self.scene
            .as_mut()
            .ok_or(ViewError::RendererNotInitialized(Surface::Globe))
    }

    /// Place the marker on `location` and show it. The camera is untouched.
    pub fn set_location(&mut self, location: &Location) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        scene.marker = Some(to_sphere_point(
            location.latitude(),
            location.longitude(),
            MARKER_RADIUS,
        ));
        Ok(())
    }

    /// Start turning the globe so `location` faces the camera.
    /// Emits [`GlobeEvent::RotationFinished`] when done.
    pub fn rotate_to(&mut self, location: &Location) -> Result<(), ViewError> {
        let duration = self.settings.rotate_duration_s;
        let scene = self.scene_mut()?;
        let target = yaw_facing(location.longitude(), scene.controls.camera.azimuth);
        scene.spin = Some(YawAnimation::new(scene.yaw, target, duration));
        scene.controls.set_suspended(true);
        log::debug!("Rotating globe to {location}");
        Ok(())
    }

    /// Request the style's texture. The current texture stays until the new
    /// one arrives; any older request still in flight is abandoned.
    pub fn set_style(&mut self, style: ViewStyle) -> Result<(), ViewError> {
        if self.scene.is_none() {
            return Err(ViewError::RendererNotInitialized(Surface::Globe));
        }
        let token = self.tokens.next_token();
        self.loader
            .request(token, style.assets().texture_url, AssetKind::Texture);
        let scene = self.scene_mut()?;
        scene.style = style;
        scene.texture_request = Some((token, style));
        Ok(())
    }

    /// Hidden globes keep animating but skip rasterization.
    pub fn set_visible(&mut self, visible: bool) {
        if let Some(scene) = self.scene.as_mut() {
            scene.visible = visible;
        }
    }

    pub fn drag(&mut self, dx: f64, dy: f64) -> Result<(), ViewError> {
        let scene = self.scene_mut()?;
        let height = scene.canvas.height() as f64;
        scene.controls.drag(dx, dy, height);
        Ok(())
    }

    pub fn zoom(&mut self, steps: i32) -> Result<(), ViewError> {
        self.scene_mut()?.controls.zoom(steps);
        Ok(())
    }

    /// Run one frame if `handle` is this renderer's pending callback.
    /// Returns false when the handle is stale and the frame was skipped.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        frame: &Frame,
        scheduler: &mut FrameScheduler,
    ) -> bool {
        self.poll_assets();
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        if scene.frame != Some(handle) {
            log::debug!("Ignoring stale globe frame {handle:?}");
            return false;
        }

        scene.controls.update(frame.dt_s);
        if let Some(spin) = scene.spin.as_mut() {
            let (yaw, done) = spin.step(frame.dt_s);
            scene.yaw = yaw;
            if done {
                scene.spin = None;
                scene.controls.set_suspended(false);
                self.events.push(GlobeEvent::RotationFinished);
            }
        }
        scene.star_spin += STAR_DRIFT * frame.dt_s;

        let (cols, rows) = scene.lease.cells();
        scene.canvas.resize(cols as usize, rows as usize);
        if scene.visible {
            scene.render(&self.outlines);
        }

        scene.frame = Some(scheduler.request(Surface::Globe));
        true
    }

    fn poll_assets(&mut self) {
        for done in self.loader.poll() {
            let Some(scene) = self.scene.as_mut() else {
                log::debug!("Dropping texture {} for disposed globe", done.url);
                continue;
            };
            match scene.texture_request {
                Some((token, style)) if token == done.token => {
                    scene.texture_request = None;
                    match done.result {
                        Ok(image) => {
                            log::info!("Globe texture ready: {style}");
                            scene.texture = Some((style, image));
                        }
                        Err(e) => log::warn!("{e}; keeping previous globe imagery"),
                    }
                }
                _ => log::debug!("Discarding stale texture {}", done.url),
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<GlobeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stop the render loop and release the scene and container. Idempotent.
    pub fn dispose(&mut self, scheduler: &mut FrameScheduler) {
        if let Some(scene) = self.scene.take() {
            if let Some(handle) = scene.frame {
                scheduler.cancel(handle);
            }
            log::info!("Globe disposed");
        }
        self.events.clear();
    }

    pub fn canvas(&self) -> Option<&RasterCanvas> {
        self.scene.as_ref().map(|s| &s.canvas)
    }

    /// Marker position in the globe's local frame, if shown.
    pub fn marker(&self) -> Option<DVec3> {
        self.scene.as_ref().and_then(|s| s.marker)
    }

    pub fn yaw(&self) -> Option<f64> {
        self.scene.as_ref().map(|s| s.yaw)
    }

    pub fn is_rotating(&self) -> bool {
        self.scene.as_ref().is_some_and(|s| s.spin.is_some())
    }

    pub fn camera(&self) -> Option<&OrbitCamera> {
        self.scene.as_ref().map(|s| &s.controls.camera)
    }

    /// Style of the texture currently on the sphere.
    pub fn texture_style(&self) -> Option<ViewStyle> {
        self.scene
            .as_ref()
            .and_then(|s| s.texture.as_ref().map(|(style, _)| *style))
    }

    pub fn frame_handle(&self) -> Option<FrameHandle> {
        self.scene.as_ref().and_then(|s| s.frame)
    }

    /// (lat, lon) under canvas pixel (px, py), if it is on the sphere.
    pub fn pick(&self, px: usize, py: usize) -> Option<(f64, f64)> {
        let scene = self.scene.as_ref()?;
        let (w, h) = (scene.canvas.width() as f64, scene.canvas.height() as f64);
        let basis = scene.controls.camera.basis();
        let dir = basis.ray(px as f64, py as f64, w, h);
        let t = basis.hit_sphere(dir, GLOBE_RADIUS)?;
        let hit = basis.eye + dir * t;
        Some(from_sphere_point(DMat3::from_rotation_y(-scene.yaw) * hit))
    }
}

impl GlobeScene {
    fn render(&mut self, outlines: &Outlines) {
        let (w, h) = (self.canvas.width(), self.canvas.height());
        if w == 0 || h == 0 {
            return;
        }
        let (wf, hf) = (w as f64, h as f64);
        let basis = self.controls.camera.basis();
        let to_world = DMat3::from_rotation_y(self.yaw);
        let to_local = DMat3::from_rotation_y(-self.yaw);
        let sun = SUN_POSITION.normalize();

        self.canvas.fill(SPACE_RGB);

        let sky = DMat3::from_rotation_y(self.star_spin) * DMat3::from_rotation_x(self.star_spin * 0.5);
        for &(dir, level) in &self.stars {
            if let Some((x, y)) = basis.project(sky * dir, wf, hf) {
                self.canvas.set_pixel_signed(x, y, [level, level, level]);
            }
        }

        let texture = self.texture.as_ref().map(|(_, image)| image.as_ref());
        let placeholder = self.style.assets().placeholder_rgb;
        for py in 0..h {
            let row = self.canvas.row_mut(py);
            for (px, out) in row.iter_mut().enumerate() {
                let dir = basis.ray(px as f64, py as f64, wf, hf);
                let Some(t) = basis.hit_sphere(dir, GLOBE_RADIUS) else {
                    continue;
                };
                let hit = basis.eye + dir * t;
                let base = match texture {
                    Some(image) => {
                        let (lat, lon) = from_sphere_point(to_local * hit);
                        image.sample((lon + 180.0) / 360.0, (90.0 - lat) / 180.0)
                    }
                    None => placeholder,
                };
                let diffuse = (hit / GLOBE_RADIUS).dot(sun).max(0.0);
                *out = shade(base, AMBIENT + SUN_INTENSITY * diffuse);
            }
        }

        if texture.is_none() {
            let max_jump = (w as i32 / 2).max(4);
            for line in outlines.lines() {
                draw_polyline(&mut self.canvas, line, max_jump, OUTLINE_RGB, |lon, lat| {
                    let p = to_world * to_sphere_point(lat, lon, GLOBE_RADIUS);
                    if basis.faces_eye(p) {
                        basis.project(p, wf, hf)
                    } else {
                        None
                    }
                });
            }
        }

        if let Some(marker) = self.marker {
            let p = to_world * marker;
            if basis.faces_eye(p) {
                if let Some((x, y)) = basis.project(p, wf, hf) {
                    draw_pin(&mut self.canvas, x, y, MARKER_RGB);
                }
            }
        }
    }
}

/// Fixed pseudo-random star directions on a large sphere, with brightness.
fn star_field() -> Vec<(DVec3, u8)> {
    (0..STAR_COUNT)
        .map(|i| {
            let z = 2.0 * star_noise(i, 1) - 1.0;
            let phi = std::f64::consts::TAU * star_noise(i, 2);
            let r = (1.0 - z * z).sqrt();
            let dir = DVec3::new(r * phi.cos(), z, r * phi.sin()) * STAR_RADIUS;
            let level = 80 + (175.0 * star_noise(i, 3)) as u8;
            (dir, level)
        })
        .collect()
}

/// Deterministic value in [0, 1) for star `index`, one stream per `channel`
/// (splitmix64 finalizer).
fn star_noise(index: u64, channel: u64) -> f64 {
    let mut x = index
        .wrapping_add(1)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ channel.wrapping_mul(0xd1b5_4a32_d192_ed03);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    (x >> 11) as f64 / (1u64 << 53) as f64
}

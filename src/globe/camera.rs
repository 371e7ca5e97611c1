use glam::DVec3;
use std::f64::consts::{PI, TAU};

/// Keep the camera off the poles so the view basis stays well defined.
const POLAR_MARGIN: f64 = 0.01;

/// Perspective camera orbiting the origin.
///
/// Spherical convention: `azimuth` is measured around +Y from +Z, `polar`
/// from +Y. Azimuth 0, polar pi/2 puts the camera on the +Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub azimuth: f64,
    pub polar: f64,
    pub distance: f64,
    /// Vertical field of view (radians)
    pub fov_y: f64,
}

/// Camera position and view basis, resolved once per frame.
#[derive(Debug, Clone, Copy)]
pub struct ViewBasis {
    pub eye: DVec3,
    /// Points from the eye toward the origin
    pub forward: DVec3,
    pub right: DVec3,
    pub up: DVec3,
    tan_half_fov: f64,
}

impl OrbitCamera {
    pub fn new(distance: f64, fov_y_deg: f64) -> Self {
        Self {
            azimuth: 0.0,
            polar: PI / 2.0,
            distance,
            fov_y: fov_y_deg.to_radians(),
        }
    }

    pub fn position(&self) -> DVec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        DVec3::new(sin_p * sin_a, cos_p, sin_p * cos_a) * self.distance
    }

    pub fn basis(&self) -> ViewBasis {
        let eye = self.position();
        let forward = (-eye).normalize();
        let right = forward.cross(DVec3::Y).normalize();
        let up = right.cross(forward).normalize();
        ViewBasis {
            eye,
            forward,
            right,
            up,
            tan_half_fov: (self.fov_y / 2.0).tan(),
        }
    }
}

impl ViewBasis {
    /// Unit ray through pixel (px, py) of a `width` x `height` image.
    #[inline(always)]
    pub fn ray(&self, px: f64, py: f64, width: f64, height: f64) -> DVec3 {
        let aspect = width / height;
        let sx = (2.0 * (px + 0.5) / width - 1.0) * aspect * self.tan_half_fov;
        let sy = (1.0 - 2.0 * (py + 0.5) / height) * self.tan_half_fov;
        (self.forward + self.right * sx + self.up * sy).normalize()
    }

    /// Project a world point to pixel coordinates.
    /// Returns `None` for points behind the camera.
    pub fn project(&self, p: DVec3, width: f64, height: f64) -> Option<(i32, i32)> {
        let v = p - self.eye;
        let depth = v.dot(self.forward);
        if depth <= 1e-9 {
            return None;
        }
        let aspect = width / height;
        let sx = v.dot(self.right) / (depth * self.tan_half_fov * aspect);
        let sy = v.dot(self.up) / (depth * self.tan_half_fov);
        let px = (sx + 1.0) / 2.0 * width - 0.5;
        let py = (1.0 - sy) / 2.0 * height - 0.5;
        Some((px.round() as i32, py.round() as i32))
    }

    /// Distance along `dir` from the eye to a sphere centred at the origin.
    #[inline(always)]
    pub fn hit_sphere(&self, dir: DVec3, radius: f64) -> Option<f64> {
        let b = self.eye.dot(dir);
        let c = self.eye.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        (t > 0.0).then_some(t)
    }

    /// True when a point on or just above a sphere at the origin faces the eye.
    pub fn faces_eye(&self, p: DVec3) -> bool {
        p.dot(self.eye - p) > 0.0
    }
}

/// Tunables for [`OrbitControls`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitSettings {
    pub min_distance: f64,
    pub max_distance: f64,
    /// Fraction of the pending rotation applied per 60 Hz frame
    pub damping: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
    /// Auto-rotation speed; 1.0 is one revolution per minute
    pub auto_rotate_speed: f64,
    /// Seconds without input before auto-rotation resumes
    pub idle_resume_s: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            min_distance: 8.0,
            max_distance: 30.0,
            damping: 0.05,
            rotate_speed: 0.5,
            zoom_speed: 0.6,
            auto_rotate_speed: 0.8,
            idle_resume_s: 3.0,
        }
    }
}

/// Drag-to-orbit and scroll-to-zoom with damping and idle auto-rotation.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub camera: OrbitCamera,
    settings: OrbitSettings,
    /// Rotation not yet applied (azimuth, polar)
    pending: (f64, f64),
    idle_s: f64,
    suspended: bool,
}

impl OrbitControls {
    pub fn new(camera: OrbitCamera, settings: OrbitSettings) -> Self {
        let mut camera = camera;
        camera.distance = camera
            .distance
            .clamp(settings.min_distance, settings.max_distance);
        Self {
            camera,
            idle_s: settings.idle_resume_s,
            settings,
            pending: (0.0, 0.0),
            suspended: false,
        }
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    /// Orbit by a pointer drag of (dx, dy) pixels on a surface `height` pixels tall.
    /// Dragging right swings the camera left, so the surface follows the pointer.
    pub fn drag(&mut self, dx: f64, dy: f64, height: f64) {
        let scale = TAU * self.settings.rotate_speed / height.max(1.0);
        self.pending.0 -= dx * scale;
        self.pending.1 -= dy * scale;
        self.idle_s = 0.0;
    }

    /// Zoom by scroll steps; positive steps move closer.
    pub fn zoom(&mut self, steps: i32) {
        let factor = 0.95f64.powf(self.settings.zoom_speed * steps as f64);
        self.camera.distance = (self.camera.distance * factor)
            .clamp(self.settings.min_distance, self.settings.max_distance);
        self.idle_s = 0.0;
    }

    /// Pause auto-rotation independently of user input. Releasing the pause
    /// counts as interaction, so rotation resumes only after the idle period.
    pub fn set_suspended(&mut self, suspended: bool) {
        if self.suspended && !suspended {
            self.idle_s = 0.0;
        }
        self.suspended = suspended;
    }

    pub fn auto_rotating(&self) -> bool {
        !self.suspended && self.idle_s >= self.settings.idle_resume_s
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        if self.auto_rotating() {
            self.camera.azimuth -= TAU / 60.0 * self.settings.auto_rotate_speed * dt;
        }

        let frames = dt * 60.0;
        let applied = 1.0 - (1.0 - self.settings.damping).powf(frames);
        self.camera.azimuth += self.pending.0 * applied;
        self.camera.polar = (self.camera.polar + self.pending.1 * applied)
            .clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
        self.pending.0 *= 1.0 - applied;
        self.pending.1 *= 1.0 - applied;
        self.camera.azimuth = self.camera.azimuth.rem_euclid(TAU);

        self.idle_s += dt;
    }
}
